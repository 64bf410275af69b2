//! XtraBackup Plugin Library
//!
//! This library provides a backup plugin wrapping Percona XtraBackup.

pub mod config;
pub mod error;
pub mod managers;
pub mod strategies;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, load_layered, resolve, Config, EffectiveConfig};
pub use error::{BackupError, ErrorKind};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use strategies::{BackupPlugin, BackupReport, XtrabackupPlugin};
