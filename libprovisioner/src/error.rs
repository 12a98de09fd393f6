//! Provisioner error types.
//!
//! Every fallible operation in `libprovisioner` returns [`ProvisionError`].
//! Failures reported by a [`GidTable`](crate::allocator::GidTable) use the
//! narrower [`AllocError`] so callers can branch on
//! [`AllocError::Conflict`] without inspecting messages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for reclaim, probe and validation operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The storage root could not be enumerated.
    #[error("failed to list contents of {}: {source}", path.display())]
    ListBasePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file exists but could not be read.
    #[error("failed to read volume metadata {}: {source}", path.display())]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file was read but is not valid JSON.
    #[error("failed to parse volume metadata {}: {source}", path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A metadata file could not be written.
    #[error("failed to write volume metadata {}: {source}", path.display())]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A recorded GID is not a valid unsigned decimal.
    #[error("invalid gid value '{0}'")]
    InvalidGid(String),

    /// Something other than a directory occupies the volume location.
    #[error("{} already exists but is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// `stat` failed for a reason other than the path not existing.
    #[error("failed to determine if {} already exists: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    /// An existing directory may not be reused for the current claim.
    #[error("{} cannot be reused: {reason}", path.display())]
    Rejected { path: PathBuf, reason: RejectReason },
}

impl ProvisionError {
    /// Create a [`ProvisionError::Rejected`] for `path`.
    pub fn rejected(path: impl Into<PathBuf>, reason: RejectReason) -> Self {
        Self::Rejected {
            path: path.into(),
            reason,
        }
    }

    /// Returns the rejection reason if this error is a reuse rejection.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Why a pre-existing directory was refused for reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The directory carries no volume metadata.
    MissingMetadata,
    /// The directory was created for a different storage class.
    StorageClassMismatch { recorded: String, requested: String },
    /// The directory was created for a different claim.
    ClaimMismatch {
        recorded_namespace: String,
        recorded_name: String,
        requested_namespace: String,
        requested_name: String,
    },
    /// The recorded GID is not a valid number.
    InvalidGid(String),
    /// The directory's owning group differs from the recorded GID.
    GidMismatch { recorded: u32, on_disk: u32 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetadata => f.write_str("directory has no volume metadata"),
            Self::StorageClassMismatch {
                recorded,
                requested,
            } => write!(
                f,
                "created for storage class {recorded} instead of the requested storage class {requested}"
            ),
            Self::ClaimMismatch {
                recorded_namespace,
                recorded_name,
                requested_namespace,
                requested_name,
            } => write!(
                f,
                "created for claim {recorded_namespace}/{recorded_name} instead of the requested claim {requested_namespace}/{requested_name}"
            ),
            Self::InvalidGid(raw) => write!(f, "metadata contains an invalid gid value '{raw}'"),
            Self::GidMismatch { recorded, on_disk } => write!(
                f,
                "its gid is {on_disk} while the volume metadata says the gid should be {recorded}"
            ),
        }
    }
}

/// Errors returned by a GID allocation table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The GID is already registered.
    #[error("gid {0} is already allocated")]
    Conflict(u32),

    /// The GID falls outside the table's range.
    #[error("gid {gid} is outside the allowed range {min}-{max}")]
    OutOfRange { gid: u32, min: u32, max: u32 },
}
