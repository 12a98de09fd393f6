//! Decide whether a directory found on disk may back a new claim.
//!
//! Reuse requires the storage class, the claim identity and (when one was
//! recorded) the GID to match. This maps a claim back to its directory after
//! the PV/PVC pair was deleted and recreated, e.g. under a `Retain` reclaim
//! policy or when a cluster is rebuilt against the same storage.

use std::path::Path;

use tracing::{error, instrument};

use crate::error::{ProvisionError, RejectReason};
use crate::metadata::read_volume_metadata;
use crate::probe::probe_directory;
use crate::types::{DirectoryIdentity, VolumeMetadata, VolumeOptions};

/// Check a pre-existing directory against the claim in `options`.
///
/// `existing_gid` is the directory's owning group as observed on disk. The
/// first failing check is logged and returned as
/// [`ProvisionError::Rejected`].
pub fn validate_preexisting_volume(
    options: &VolumeOptions,
    metadata: Option<&VolumeMetadata>,
    volume_path: &Path,
    existing_gid: u32,
) -> Result<(), ProvisionError> {
    check(options, metadata, existing_gid).map_err(|reason| {
        error!(path = %volume_path.display(), %reason, "refusing to reuse existing volume directory");
        ProvisionError::rejected(volume_path, reason)
    })
}

fn check(
    options: &VolumeOptions,
    metadata: Option<&VolumeMetadata>,
    existing_gid: u32,
) -> Result<(), RejectReason> {
    let md = metadata.ok_or(RejectReason::MissingMetadata)?;

    let class = options.pvc.storage_class();
    if md.storage_class_name != class {
        return Err(RejectReason::StorageClassMismatch {
            recorded: md.storage_class_name.clone(),
            requested: class.to_owned(),
        });
    }

    if md.pvc_name != options.pvc.name || md.pvc_namespace != options.pvc.namespace {
        return Err(RejectReason::ClaimMismatch {
            recorded_namespace: md.pvc_namespace.clone(),
            recorded_name: md.pvc_name.clone(),
            requested_namespace: options.pvc.namespace.clone(),
            requested_name: options.pvc.name.clone(),
        });
    }

    // No GID recorded: the volume was created without GID enforcement.
    let Some(recorded) = md
        .gid()
        .map_err(|_| RejectReason::InvalidGid(md.gid.clone()))?
    else {
        return Ok(());
    };

    if recorded != existing_gid {
        return Err(RejectReason::GidMismatch {
            recorded,
            on_disk: existing_gid,
        });
    }
    Ok(())
}

/// Probe `volume_path` and, if a directory is there, validate it for reuse.
///
/// Returns `Ok(None)` when nothing exists and a new volume should be
/// created, or `Ok(Some(gid))` with the directory's owning group when it
/// may be reused as-is.
#[instrument(skip(options), fields(pvc = %options.pvc.name, namespace = %options.pvc.namespace))]
pub async fn check_preexisting_volume(
    options: &VolumeOptions,
    volume_path: &Path,
) -> Result<Option<u32>, ProvisionError> {
    let gid = match probe_directory(volume_path)? {
        DirectoryIdentity::Missing => return Ok(None),
        DirectoryIdentity::Directory { gid } => gid,
    };

    let lookup = read_volume_metadata(volume_path).await?;
    validate_preexisting_volume(options, lookup.as_found(), volume_path, gid)?;
    Ok(Some(gid))
}
