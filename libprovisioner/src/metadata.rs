//! Per-volume metadata persistence.
//!
//! # On-disk layout
//!
//! ```text
//! <base_path>/
//!   <volume-dir>/
//!     .volume-metadata.json   # written once when the volume is created
//! ```
//!
//! Storage classes that do not persist metadata leave the file out; that is
//! reported as [`MetadataLookup::Absent`], never as an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ProvisionError;
use crate::types::{MetadataLookup, VolumeMetadata};

/// Name of the metadata file inside a volume directory.
pub const METADATA_FILE_NAME: &str = ".volume-metadata.json";

/// Path of the metadata file for the volume rooted at `volume_dir`.
pub fn metadata_path(volume_dir: &Path) -> PathBuf {
    volume_dir.join(METADATA_FILE_NAME)
}

/// Load the metadata stored in `volume_dir`.
pub async fn read_volume_metadata(volume_dir: &Path) -> Result<MetadataLookup, ProvisionError> {
    let path = metadata_path(volume_dir);
    let json = match tokio::fs::read_to_string(&path).await {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MetadataLookup::Absent),
        Err(source) => return Err(ProvisionError::MetadataRead { path, source }),
    };

    let md = serde_json::from_str(&json)
        .map_err(|source| ProvisionError::MetadataParse { path, source })?;
    Ok(MetadataLookup::Found(md))
}

/// Persist `md` into `volume_dir`.
///
/// The JSON is written to a temporary sibling and renamed over the final
/// name so readers never observe a half-written file.
pub async fn write_volume_metadata(
    volume_dir: &Path,
    md: &VolumeMetadata,
) -> Result<(), ProvisionError> {
    let path = metadata_path(volume_dir);
    let tmp = volume_dir.join(format!("{METADATA_FILE_NAME}.tmp"));

    let json = serde_json::to_string_pretty(md).map_err(|e| ProvisionError::MetadataWrite {
        path: path.clone(),
        source: e.into(),
    })?;
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|source| ProvisionError::MetadataWrite {
            path: tmp.clone(),
            source,
        })?;
    if let Err(source) = tokio::fs::rename(&tmp, &path).await {
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), error = %e, "failed to remove temporary metadata file");
        }
        return Err(ProvisionError::MetadataWrite { path, source });
    }

    debug!(path = %path.display(), "volume metadata written");
    Ok(())
}
