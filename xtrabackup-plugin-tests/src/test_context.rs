//! Test context and harness for pipeline testing
//!
//! Provides a unified context for setting up a target directory and fake
//! tool scripts, and for inspecting what a backup left behind.

use crate::fixtures::{mysql_script, FakeTool};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// Backup target directory inside the temp dir
    target_dir: PathBuf,
    /// Directory holding fake tool scripts
    bin_dir: PathBuf,
}

impl TestContext {
    /// Create a new test context with empty target and bin directories
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let target_dir = temp_dir.path().join("target");
        let bin_dir = temp_dir.path().join("bin");
        fs::create_dir_all(&target_dir).expect("Failed to create target directory");
        fs::create_dir_all(&bin_dir).expect("Failed to create bin directory");

        Self {
            temp_dir,
            target_dir,
            bin_dir,
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup target directory
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Install a fake xtrabackup/innobackupex script named `name`
    pub fn install_tool(&self, name: &str, tool: &FakeTool) -> PathBuf {
        let script = tool.script(&self.args_log_path(name).display().to_string());
        self.install_script(name, &script)
    }

    /// Install a fake mysql client reporting `datadir`
    pub fn install_mysql(&self, datadir: &Path) -> PathBuf {
        let script = mysql_script(
            &self.args_log_path("mysql").display().to_string(),
            &datadir.display().to_string(),
        );
        self.install_script("mysql", &script)
    }

    /// Path of a script that does not exist
    pub fn missing_tool(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    /// Arguments of every recorded invocation of `name`, one line per call
    pub fn invocations(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.args_log_path(name))
            .map(|s| s.lines().map(|l| l.to_string()).collect())
            .unwrap_or_default()
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Check if a file exists in the target directory
    pub fn target_file_exists(&self, name: &str) -> bool {
        self.target_dir.join(name).exists()
    }

    /// Read a file from the target directory
    pub fn read_target_file(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.target_dir.join(name))?)
    }

    fn args_log_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(format!("{}.args", name))
    }

    fn install_script(&self, name: &str, script: &str) -> PathBuf {
        let path = self.bin_dir.join(name);
        fs::write(&path, script).expect("Failed to write fake tool");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to make fake tool executable");
        }

        path
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(_) => panic!("Expected Err containing '{}', got Ok", needle),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
