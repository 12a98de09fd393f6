//! Core data model: volume metadata, directory identity and volume requests.
//!
//! [`VolumeMetadata`] is the only type persisted to disk; the rest are
//! derived per call or owned by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

/// Annotation that overrides `spec.storageClassName` on a claim.
pub const BETA_STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

// ---------------------------------------------------------------------------
// Volume metadata
// ---------------------------------------------------------------------------

/// Descriptor written into each provisioned volume directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeMetadata {
    /// Storage class the volume was provisioned for.
    pub storage_class_name: String,
    /// Name of the claim the volume was provisioned for.
    pub pvc_name: String,
    /// Namespace of the claim the volume was provisioned for.
    pub pvc_namespace: String,
    /// Decimal GID owning the directory, or empty when none was assigned.
    pub gid: String,
}

impl VolumeMetadata {
    /// Parse the recorded GID.
    ///
    /// Returns `Ok(None)` when no GID was assigned.
    pub fn gid(&self) -> Result<Option<u32>, ProvisionError> {
        if self.gid.is_empty() {
            return Ok(None);
        }
        self.gid
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ProvisionError::InvalidGid(self.gid.clone()))
    }
}

/// Outcome of looking for a volume's metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLookup {
    /// A metadata file was present and parsed.
    Found(VolumeMetadata),
    /// No metadata file exists in the directory.
    Absent,
}

impl MetadataLookup {
    pub fn as_found(&self) -> Option<&VolumeMetadata> {
        match self {
            Self::Found(md) => Some(md),
            Self::Absent => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Directory identity
// ---------------------------------------------------------------------------

/// What a `stat` of the expected volume location revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryIdentity {
    /// Nothing exists at the path.
    Missing,
    /// A directory exists and is owned by `gid`.
    Directory { gid: u32 },
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The subset of a PersistentVolumeClaim the provisioner inspects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub storage_class_name: Option<String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl PersistentVolumeClaim {
    /// Resolve the claim's storage class.
    ///
    /// The beta annotation takes precedence over `storageClassName`; a claim
    /// with neither resolves to the empty string.
    pub fn storage_class(&self) -> &str {
        if let Some(class) = self.annotations.get(BETA_STORAGE_CLASS_ANNOTATION) {
            return class;
        }
        self.storage_class_name.as_deref().unwrap_or_default()
    }
}

/// Request descriptor handed to the provisioner for a new volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeOptions {
    /// Claim the volume is being provisioned for.
    pub pvc: PersistentVolumeClaim,
}

impl VolumeOptions {
    pub fn new(pvc: PersistentVolumeClaim) -> Self {
        Self { pvc }
    }
}
