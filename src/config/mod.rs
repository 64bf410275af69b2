//! Configuration module for the xtrabackup plugin
//!
//! This module handles loading, merging, validating and resolving configuration
//! from TOML files.
//!
//! ## Configuration Layers
//!
//! Settings are applied in this order (later overrides earlier):
//! 1. Global defaults file
//! 2. Backupset file
//! 3. Per-run `section.key=value` overrides
//!
//! Missing keys fall back to the field defaults in [`types`]. The merged
//! result is resolved into an immutable [`EffectiveConfig`] before any
//! process is launched.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::path::Path;
//! use xtrabackup_plugin::config;
//!
//! let raw = config::load_layered(
//!     &[Path::new("/etc/backup/global.toml"), Path::new("/etc/backup/nightly.toml")],
//!     &["xtrabackup.stream=xbstream".to_string()],
//! )?;
//! let effective = config::resolve(&raw)?;
//! println!("stream: {:?}", effective.xtrabackup.stream);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    apply_override, load_config, load_layered, merge_tables, resolve, ConfigError, Result,
    MAX_COMPRESSION_LEVEL,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
