//! Test utilities for xtrabackup-plugin
//!
//! This crate provides shared test utilities, fake tool scripts,
//! and helper functions for testing the xtrabackup plugin.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, FakeTool, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));
//!     let (config, _dir) = ConfigBuilder::new().with_xtrabackup(&xtrabackup).effective();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod logs;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use logs::{capture_logs, LogCapture};
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use xtrabackup_plugin::config::{
    CompressionConfig, CompressionMethod, Config, EffectiveConfig, MysqlClientConfig,
    XtrabackupConfig,
};
pub use xtrabackup_plugin::error::{BackupError, ErrorKind};
pub use xtrabackup_plugin::strategies::{BackupPlugin, BackupReport, XtrabackupPlugin};

// Re-export mock implementations from the main crate
pub use xtrabackup_plugin::utils::executor::mock::{MockExecutor, MockResponse};
pub use xtrabackup_plugin::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
