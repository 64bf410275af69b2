//! Backup manager - orchestrates a single backup job

use crate::config::EffectiveConfig;
use crate::error::{BackupError, Result};
use crate::strategies::{BackupPlugin, BackupReport, XtrabackupPlugin};
use crate::utils::executor::{CommandExecutor, RealExecutor};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct BackupManager {
    config: EffectiveConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl BackupManager {
    /// Create new backup manager
    pub fn new(config: EffectiveConfig) -> Self {
        Self::with_executor(config, Arc::new(RealExecutor::new()))
    }

    /// Create backup manager with a specific command executor
    pub fn with_executor(config: EffectiveConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    /// Run one backup job into `target_directory`
    pub fn run(&self, name: &str, target_directory: &Path, dry_run: bool) -> Result<BackupReport> {
        fs::create_dir_all(target_directory).map_err(|e| {
            BackupError::io(
                format!("Failed to create target directory {}", target_directory.display()),
                e,
            )
        })?;

        let plugin = self.plugin(name, target_directory, dry_run)?;
        info!("Starting {} backup '{}'", plugin.name(), name);

        if self.config.xtrabackup.estimate_size && !dry_run {
            // Advisory only
            match plugin.estimate_backup_size() {
                Ok(bytes) => info!("Estimated backup size: {}", format_size(bytes)),
                Err(e) => warn!("Size estimate failed: {}", e),
            }
        }

        match plugin.backup() {
            Ok(report) => {
                if report.dry_run {
                    info!("Dry run of '{}' completed successfully", name);
                } else {
                    info!(
                        "Backup '{}' completed in {}s",
                        name,
                        report.duration().num_seconds()
                    );
                    if let Some(archive) = &report.archive {
                        info!("Archive: {}", archive.display());
                    }
                }
                Ok(report)
            }
            Err(e) => {
                if e.backup_captured() {
                    warn!(
                        "Backup data for '{}' was captured in {}, but a later step failed",
                        name,
                        target_directory.display()
                    );
                }
                error!("Backup '{}' failed: {}", name, e);
                Err(e)
            }
        }
    }

    /// Estimate the size of a backup without running it
    pub fn estimate(&self, name: &str, target_directory: &Path) -> Result<u64> {
        fs::create_dir_all(target_directory).map_err(|e| {
            BackupError::io(
                format!("Failed to create target directory {}", target_directory.display()),
                e,
            )
        })?;

        self.plugin(name, target_directory, false)?
            .estimate_backup_size()
    }

    fn plugin(&self, name: &str, target_directory: &Path, dry_run: bool) -> Result<XtrabackupPlugin> {
        XtrabackupPlugin::with_executor(
            name,
            self.config.clone(),
            target_directory,
            dry_run,
            Arc::clone(&self.executor),
        )
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
