//! Inspect the expected location of a volume directory.

use std::path::Path;

use nix::errno::Errno;
use nix::sys::stat::{SFlag, stat};
use tracing::error;

use crate::error::ProvisionError;
use crate::types::DirectoryIdentity;

/// Determine whether a volume directory already exists at `path` and, if so,
/// which group owns it.
///
/// A missing path is the normal "create new" precondition. Anything other
/// than a directory at `path` is a naming collision and is returned as
/// [`ProvisionError::NotADirectory`].
pub fn probe_directory(path: &Path) -> Result<DirectoryIdentity, ProvisionError> {
    let st = match stat(path) {
        Ok(st) => st,
        Err(Errno::ENOENT) => return Ok(DirectoryIdentity::Missing),
        Err(source) => {
            let err = ProvisionError::Stat {
                path: path.to_path_buf(),
                source,
            };
            error!(path = %path.display(), error = %err, "failed to stat volume path");
            return Err(err);
        }
    };

    let kind = SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT;
    if kind != SFlag::S_IFDIR {
        let err = ProvisionError::NotADirectory {
            path: path.to_path_buf(),
        };
        error!(path = %path.display(), "volume path is occupied by a non-directory");
        return Err(err);
    }

    Ok(DirectoryIdentity::Directory { gid: st.st_gid })
}
