//! GID allocation table.
//!
//! The reclaim scan only ever registers GIDs it finds on disk, so the
//! [`GidTable`] seam is a single `allocate` call. [`MinMaxAllocator`] is the
//! in-process table the provisioner shares between reclaim and provisioning.

use std::ops::RangeInclusive;

use dashmap::DashSet;

use crate::error::AllocError;

/// A table of GIDs in use.
///
/// Implementations must tolerate concurrent registration: provisioning
/// requests that run after reclaim allocate from the same table.
pub trait GidTable: Send + Sync {
    /// Mark `gid` as in use.
    ///
    /// Returns [`AllocError::Conflict`] when the GID is already registered.
    fn allocate(&self, gid: u32) -> Result<(), AllocError>;
}

/// Thread-safe table bounded to an inclusive `[min, max]` range.
#[derive(Debug)]
pub struct MinMaxAllocator {
    min: u32,
    max: u32,
    used: DashSet<u32>,
}

impl MinMaxAllocator {
    /// Create an empty table covering `min..=max`.
    ///
    /// Returns `None` if `min > max`.
    pub fn new(min: u32, max: u32) -> Option<Self> {
        (min <= max).then(|| Self {
            min,
            max,
            used: DashSet::new(),
        })
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }

    /// Return `gid` to the free pool. Returns `false` if it was not in use.
    pub fn release(&self, gid: u32) -> bool {
        self.used.remove(&gid).is_some()
    }

    pub fn has(&self, gid: u32) -> bool {
        self.used.contains(&gid)
    }

    /// Number of GIDs currently in use.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Number of GIDs still available in the range.
    pub fn free(&self) -> u64 {
        u64::from(self.max - self.min) + 1 - self.used.len() as u64
    }

    /// Sorted snapshot of the GIDs in use.
    pub fn allocated(&self) -> Vec<u32> {
        let mut gids: Vec<u32> = self.used.iter().map(|g| *g).collect();
        gids.sort_unstable();
        gids
    }
}

impl GidTable for MinMaxAllocator {
    fn allocate(&self, gid: u32) -> Result<(), AllocError> {
        if !self.range().contains(&gid) {
            return Err(AllocError::OutOfRange {
                gid,
                min: self.min,
                max: self.max,
            });
        }
        // `insert` is atomic per shard, so two racing callers cannot both win.
        if self.used.insert(gid) {
            Ok(())
        } else {
            Err(AllocError::Conflict(gid))
        }
    }
}
