//! Rebuild the GID allocation table from volumes already on disk.
//!
//! Every top-level directory under the storage root is a volume. Volumes
//! provisioned with GID enforcement record the GID in their metadata file;
//! [`FileSystemReclaimer`] feeds those GIDs back into a [`GidTable`] so the
//! provisioner does not hand them out a second time after a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::allocator::GidTable;
use crate::error::{AllocError, ProvisionError};
use crate::metadata::read_volume_metadata;
use crate::types::MetadataLookup;

/// Restores previously assigned GIDs for a storage class.
#[async_trait]
pub trait GidReclaimer: Send + Sync {
    /// Register every GID recorded for `storage_class` in `table`.
    ///
    /// Only a failure to enumerate the storage root is returned; problems
    /// with individual volumes are logged and skipped.
    async fn reclaim(&self, storage_class: &str, table: &dyn GidTable)
    -> Result<(), ProvisionError>;
}

/// Reclaimer for volumes laid out as sub-directories of a base path.
#[derive(Debug, Clone)]
pub struct FileSystemReclaimer {
    base_path: PathBuf,
}

/// Tally of one reclaim pass, logged when the scan finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ReclaimStats {
    scanned: usize,
    reclaimed: usize,
    conflicts: usize,
    skipped: usize,
}

/// What happened to a single volume directory.
enum Outcome {
    Reclaimed,
    Conflict,
    Skipped,
}

impl FileSystemReclaimer {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn list_error(&self, source: std::io::Error) -> ProvisionError {
        error!(path = %self.base_path.display(), error = %source, "failed to list storage root");
        ProvisionError::ListBasePath {
            path: self.base_path.clone(),
            source,
        }
    }

    async fn reclaim_volume(
        &self,
        volume_dir: &Path,
        storage_class: &str,
        table: &dyn GidTable,
    ) -> Outcome {
        let md = match read_volume_metadata(volume_dir).await {
            Ok(MetadataLookup::Found(md)) => md,
            // Storage classes that don't reuse volumes never write metadata.
            Ok(MetadataLookup::Absent) => return Outcome::Skipped,
            Err(e) => {
                warn!(path = %volume_dir.display(), error = %e, "failed to read volume metadata, skipping");
                return Outcome::Skipped;
            }
        };

        if md.storage_class_name != storage_class {
            return Outcome::Skipped;
        }

        let gid = match md.gid() {
            Ok(Some(gid)) => gid,
            Ok(None) => return Outcome::Skipped,
            Err(_) => {
                error!(path = %volume_dir.display(), gid = %md.gid, "invalid GID value in volume metadata");
                return Outcome::Skipped;
            }
        };

        match table.allocate(gid) {
            Ok(()) => Outcome::Reclaimed,
            Err(AllocError::Conflict(_)) => {
                info!(gid, path = %volume_dir.display(), storage_class, "gid was already allocated");
                Outcome::Conflict
            }
            Err(e) => {
                error!(gid, path = %volume_dir.display(), error = %e, "failed to store GID found in volume metadata");
                Outcome::Skipped
            }
        }
    }
}

#[async_trait]
impl GidReclaimer for FileSystemReclaimer {
    #[instrument(skip(self, table), fields(base_path = %self.base_path.display()))]
    async fn reclaim(
        &self,
        storage_class: &str,
        table: &dyn GidTable,
    ) -> Result<(), ProvisionError> {
        info!("adding GIDs of existing volume directories to the GID table");

        let mut dir = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|e| self.list_error(e))?;

        let mut stats = ReclaimStats::default();
        while let Some(entry) = dir.next_entry().await.map_err(|e| self.list_error(e))? {
            let path = entry.path();

            // Symlinks are not followed: only real directories are volumes.
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to determine entry type, skipping");
                    continue;
                }
            }

            stats.scanned += 1;
            match self.reclaim_volume(&path, storage_class, table).await {
                Outcome::Reclaimed => stats.reclaimed += 1,
                Outcome::Conflict => stats.conflicts += 1,
                Outcome::Skipped => stats.skipped += 1,
            }
        }

        info!(
            scanned = stats.scanned,
            reclaimed = stats.reclaimed,
            conflicts = stats.conflicts,
            skipped = stats.skipped,
            "reclaim complete",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::allocator::MinMaxAllocator;
    use crate::metadata::{metadata_path, write_volume_metadata};
    use crate::types::VolumeMetadata;

    /// Records every GID offered to it; conflicts on repeats.
    #[derive(Default)]
    struct RecordingTable {
        calls: Mutex<Vec<u32>>,
    }

    impl RecordingTable {
        fn calls(&self) -> Vec<u32> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_unstable();
            calls
        }
    }

    impl GidTable for RecordingTable {
        fn allocate(&self, gid: u32) -> Result<(), AllocError> {
            let mut calls = self.calls.lock().unwrap();
            let seen = calls.contains(&gid);
            calls.push(gid);
            if seen {
                Err(AllocError::Conflict(gid))
            } else {
                Ok(())
            }
        }
    }

    async fn volume(root: &Path, name: &str, class: &str, gid: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir(&dir).unwrap();
        let md = VolumeMetadata {
            storage_class_name: class.into(),
            pvc_name: format!("{name}-claim"),
            pvc_namespace: "default".into(),
            gid: gid.into(),
        };
        write_volume_metadata(&dir, &md).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn directory_without_metadata_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("bare")).unwrap();

        let table = RecordingTable::default();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("slow", &table)
            .await
            .unwrap();
        assert!(table.calls().is_empty());
    }

    #[tokio::test]
    async fn foreign_class_and_empty_gid_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        volume(tmp.path(), "other-class", "fast", "2001").await;
        volume(tmp.path(), "no-gid", "slow", "").await;
        volume(tmp.path(), "mine", "slow", "2002").await;

        let table = RecordingTable::default();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("slow", &table)
            .await
            .unwrap();
        assert_eq!(table.calls(), vec![2002]);
    }

    #[tokio::test]
    async fn bad_entries_do_not_stop_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        for (name, gid) in [("good-1", "2010"), ("good-2", "2011"), ("good-3", "2012")] {
            volume(tmp.path(), name, "slow", gid).await;
        }
        volume(tmp.path(), "bad-gid-1", "slow", "not-a-number").await;
        volume(tmp.path(), "bad-gid-2", "slow", "-1").await;
        for name in ["corrupt-1", "corrupt-2"] {
            let corrupt = tmp.path().join(name);
            std::fs::create_dir(&corrupt).unwrap();
            std::fs::write(metadata_path(&corrupt), "{ truncated").unwrap();
        }
        for gid in ["2013", "2014"] {
            volume(tmp.path(), &format!("good-{gid}"), "slow", gid).await;
        }

        let table = RecordingTable::default();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("slow", &table)
            .await
            .unwrap();
        // Every well-formed volume is offered whatever the listing order.
        assert_eq!(table.calls(), vec![2010, 2011, 2012, 2013, 2014]);
    }

    #[tokio::test]
    async fn conflict_does_not_stop_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        volume(tmp.path(), "taken", "fast", "3000").await;
        volume(tmp.path(), "free-1", "fast", "3001").await;
        volume(tmp.path(), "free-2", "fast", "3002").await;

        let table = MinMaxAllocator::new(2000, 4000).unwrap();
        table.allocate(3000).unwrap();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("fast", &table)
            .await
            .unwrap();
        assert_eq!(table.allocated(), vec![3000, 3001, 3002]);
    }

    #[tokio::test]
    async fn every_gid_is_offered_after_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let volumes = [
            ("a", "3000"),
            ("b", "3000"),
            ("c", "3001"),
            ("d", "3001"),
            ("e", "3002"),
        ];
        for (name, gid) in volumes {
            volume(tmp.path(), name, "fast", gid).await;
        }

        let table = RecordingTable::default();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("fast", &table)
            .await
            .unwrap();
        assert_eq!(table.calls(), vec![3000, 3000, 3001, 3001, 3002]);
    }

    #[tokio::test]
    async fn files_in_root_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("lost+found.txt"), b"x").unwrap();
        volume(tmp.path(), "vol", "slow", "2004").await;

        let table = RecordingTable::default();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("slow", &table)
            .await
            .unwrap();
        assert_eq!(table.calls(), vec![2004]);
    }

    #[tokio::test]
    async fn out_of_range_gid_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        volume(tmp.path(), "low", "slow", "10").await;
        volume(tmp.path(), "ok", "slow", "2500").await;

        let table = MinMaxAllocator::new(2000, 3000).unwrap();
        FileSystemReclaimer::new(tmp.path())
            .reclaim("slow", &table)
            .await
            .unwrap();
        assert_eq!(table.allocated(), vec![2500]);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        volume(tmp.path(), "vol", "slow", "2005").await;

        let table = MinMaxAllocator::new(2000, 3000).unwrap();
        let reclaimer = FileSystemReclaimer::new(tmp.path());
        reclaimer.reclaim("slow", &table).await.unwrap();
        reclaimer.reclaim("slow", &table).await.unwrap();
        assert_eq!(table.allocated(), vec![2005]);
    }

    #[tokio::test]
    async fn missing_base_path_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let table = RecordingTable::default();
        let err = FileSystemReclaimer::new(tmp.path().join("absent"))
            .reclaim("slow", &table)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::ListBasePath { .. }));
    }
}
