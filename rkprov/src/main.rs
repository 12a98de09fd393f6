use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use libprovisioner::config::{BASE_PATH_ENV, GID_MAX_ENV, GID_MIN_ENV};
use libprovisioner::{
    FileSystemReclaimer, GidReclaimer, PersistentVolumeClaim, ProvisionerConfig, VolumeOptions,
    check_preexisting_volume,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rkprov")]
#[command(version, about = "Inspect GID state of directory-backed volumes", long_about = None)]
struct Cli {
    /// Storage root holding one directory per volume (overrides RKPROV_BASE_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    base_path: Option<PathBuf>,

    /// Lowest GID of the allocation range (overrides RKPROV_GID_MIN)
    #[arg(long, global = true)]
    gid_min: Option<u32>,

    /// Highest GID of the allocation range (overrides RKPROV_GID_MAX)
    #[arg(long, global = true)]
    gid_max: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the GID table of each storage class from on-disk metadata
    Reclaim {
        /// Storage class to reclaim GIDs for (repeatable)
        #[arg(short, long = "class", value_name = "NAME", required = true)]
        classes: Vec<String>,
    },

    /// Check whether an existing volume directory may be reused by a claim
    Check {
        /// Storage class requested by the claim
        #[arg(short, long)]
        class: String,

        /// Claim as <namespace>/<name>
        #[arg(long, value_name = "NAMESPACE/NAME")]
        pvc: String,

        /// Volume directory name under the storage root
        #[arg(value_name = "DIR_NAME")]
        dir_name: String,
    },
}

impl Cli {
    fn config(&self) -> Result<ProvisionerConfig> {
        self.config_with(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration, letting flags shadow environment keys so an
    /// overridden variable is never parsed.
    fn config_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ProvisionerConfig> {
        ProvisionerConfig::from_lookup(|key| match key {
            BASE_PATH_ENV if self.base_path.is_some() => self
                .base_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            GID_MIN_ENV if self.gid_min.is_some() => self.gid_min.map(|g| g.to_string()),
            GID_MAX_ENV if self.gid_max.is_some() => self.gid_max.map(|g| g.to_string()),
            _ => env(key),
        })
    }
}

fn parse_claim(pvc: &str, class: String) -> Result<VolumeOptions> {
    let Some((namespace, name)) = pvc.split_once('/') else {
        bail!("claim must be given as <namespace>/<name>, got {pvc:?}");
    };
    if namespace.is_empty() || name.is_empty() {
        bail!("claim must be given as <namespace>/<name>, got {pvc:?}");
    }
    Ok(VolumeOptions::new(PersistentVolumeClaim {
        name: name.to_owned(),
        namespace: namespace.to_owned(),
        storage_class_name: Some(class),
        ..Default::default()
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;
    info!(base_path = %config.base_path.display(), gid_min = config.gid_min, gid_max = config.gid_max, "loaded configuration");

    match cli.command {
        Commands::Reclaim { classes } => {
            let reclaimer = FileSystemReclaimer::new(&config.base_path);
            for class in classes {
                let table = config.gid_table()?;
                reclaimer
                    .reclaim(&class, &table)
                    .await
                    .with_context(|| format!("reclaim for storage class {class} failed"))?;
                println!(
                    "{class}: {} gid(s) in use, {} free: {:?}",
                    table.len(),
                    table.free(),
                    table.allocated()
                );
            }
        }
        Commands::Check {
            class,
            pvc,
            dir_name,
        } => {
            let options = parse_claim(&pvc, class)?;
            let path = config.base_path.join(&dir_name);
            match check_preexisting_volume(&options, &path).await? {
                None => println!("{}: does not exist, a new volume would be created", path.display()),
                Some(gid) => println!("{}: may be reused (gid {gid})", path.display()),
            }
        }
    }
    Ok(())
}
