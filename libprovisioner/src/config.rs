//! Provisioner configuration.
//!
//! Environment variables:
//! - `RKPROV_BASE_PATH`: directory holding one sub-directory per volume.
//!   Defaults to `/persistentvolumes`.
//! - `RKPROV_GID_MIN` / `RKPROV_GID_MAX`: inclusive GID range handed out by
//!   the provisioner. Default to `2000` and `2147483647`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::allocator::MinMaxAllocator;

pub const BASE_PATH_ENV: &str = "RKPROV_BASE_PATH";
pub const GID_MIN_ENV: &str = "RKPROV_GID_MIN";
pub const GID_MAX_ENV: &str = "RKPROV_GID_MAX";

static DEFAULT_BASE_PATH: &str = "/persistentvolumes";
pub const DEFAULT_GID_MIN: u32 = 2000;
pub const DEFAULT_GID_MAX: u32 = i32::MAX as u32;

/// Settings shared by the reclaim scan and the provisioning path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    pub base_path: PathBuf,
    pub gid_min: u32,
    pub gid_max: u32,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            gid_min: DEFAULT_GID_MIN,
            gid_max: DEFAULT_GID_MAX,
        }
    }
}

impl ProvisionerConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let gid = |key: &str, default: u32| -> Result<u32> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a GID, got {v:?}")),
                None => Ok(default),
            }
        };

        let config = Self {
            base_path: lookup(BASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.base_path),
            gid_min: gid(GID_MIN_ENV, defaults.gid_min)?,
            gid_max: gid(GID_MAX_ENV, defaults.gid_max)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gid_min > self.gid_max {
            bail!(
                "gid range is empty: min {} is greater than max {}",
                self.gid_min,
                self.gid_max
            );
        }
        Ok(())
    }

    /// Create an empty allocation table covering the configured range.
    pub fn gid_table(&self) -> Result<MinMaxAllocator> {
        MinMaxAllocator::new(self.gid_min, self.gid_max)
            .with_context(|| format!("invalid gid range {}-{}", self.gid_min, self.gid_max))
    }
}
