pub mod xtrabackup;

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub use xtrabackup::XtrabackupPlugin;

/// Trait for backup plugins
pub trait BackupPlugin {
    /// Rough size in bytes of what a backup would capture
    fn estimate_backup_size(&self) -> Result<u64>;

    /// Run one backup into the plugin's target directory
    fn backup(&self) -> Result<BackupReport>;

    /// Get plugin name (for logging)
    fn name(&self) -> &'static str;
}

/// Summary of a finished backup
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub name: String,
    pub target_directory: PathBuf,
    pub dry_run: bool,
    /// Archive file, when the backup was streamed
    pub archive: Option<PathBuf>,
    pub logs_applied: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BackupReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
