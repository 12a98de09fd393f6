//! # libprovisioner — GID recovery for directory-backed volumes
//!
//! `libprovisioner` holds the restart-sensitive pieces of a provisioner that
//! carves persistent volumes out of sub-directories of a shared filesystem
//! (EFS, NFS, SlayerFS mounts). It rebuilds the GID allocation table from
//! the metadata stored in each volume directory, and decides whether a
//! directory found on disk may be reused for an incoming claim.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | `VolumeMetadata`, `MetadataLookup`, `DirectoryIdentity`, `VolumeOptions`. |
//! | [`error`] | [`ProvisionError`] and the allocation [`AllocError`]. |
//! | [`metadata`] | Read / write the per-volume metadata file. |
//! | [`allocator`] | [`GidTable`] trait and the [`MinMaxAllocator`] table. |
//! | [`probe`] | Existence, type and owning group of a volume path. |
//! | [`validate`] | Reuse decision for pre-existing directories. |
//! | [`reclaimer`] | [`GidReclaimer`] trait and [`FileSystemReclaimer`]. |
//! | [`config`] | Environment-driven [`ProvisionerConfig`]. |

pub mod allocator;
pub mod config;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod reclaimer;
pub mod types;
pub mod validate;

pub use allocator::{GidTable, MinMaxAllocator};
pub use config::ProvisionerConfig;
pub use error::{AllocError, ProvisionError, RejectReason};
pub use metadata::{read_volume_metadata, write_volume_metadata};
pub use probe::probe_directory;
pub use reclaimer::{FileSystemReclaimer, GidReclaimer};
pub use types::*;
pub use validate::{check_preexisting_volume, validate_preexisting_volume};
