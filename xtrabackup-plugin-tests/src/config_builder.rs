//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible
//! defaults. Every builder owns a temporary directory holding the global
//! defaults file, so the resulting configuration is always materializable.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xtrabackup_plugin::config::{resolve, CompressionMethod, Config, EffectiveConfig};

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with minimal defaults
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let global_defaults = temp_dir.path().join("global.cnf");
        fs::write(&global_defaults, "[mysqld]\ndatadir = /var/lib/mysql\n")
            .expect("Failed to write global defaults");

        let mut config = Config::default();
        config.xtrabackup.global_defaults = global_defaults;
        config.xtrabackup.estimate_size = false;

        Self { temp_dir, config }
    }

    /// Alias of [`ConfigBuilder::new`]
    pub fn minimal() -> Self {
        Self::new()
    }

    pub fn with_xtrabackup(mut self, path: &Path) -> Self {
        self.config.xtrabackup.xtrabackup = path.display().to_string();
        self
    }

    pub fn with_innobackupex(mut self, path: &Path) -> Self {
        self.config.xtrabackup.innobackupex = path.display().to_string();
        self
    }

    pub fn with_mysql(mut self, path: &Path) -> Self {
        self.config.mysql_client.mysql = path.display().to_string();
        self
    }

    pub fn with_stream(mut self, stream: &str) -> Self {
        self.config.xtrabackup.stream = stream.to_string();
        self
    }

    pub fn with_compression(mut self, method: CompressionMethod, level: u32) -> Self {
        self.config.compression.method = method;
        self.config.compression.level = level;
        self
    }

    pub fn with_apply_logs(mut self, enabled: bool) -> Self {
        self.config.xtrabackup.apply_logs = enabled;
        self
    }

    pub fn with_tmpdir(mut self, tmpdir: &str) -> Self {
        self.config.xtrabackup.tmpdir = Some(tmpdir.to_string());
        self
    }

    pub fn with_pre_command(mut self, command: &str) -> Self {
        self.config.xtrabackup.pre_command = Some(command.to_string());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.xtrabackup.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_additional_options(mut self, options: &[&str]) -> Self {
        self.config.xtrabackup.additional_options =
            options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_estimate_size(mut self, enabled: bool) -> Self {
        self.config.xtrabackup.estimate_size = enabled;
        self
    }

    /// Set `[mysql-client]` credentials
    pub fn with_client(mut self, user: &str, password: &str) -> Self {
        self.config.mysql_client.user = Some(user.to_string());
        self.config.mysql_client.password = Some(password.to_string());
        self
    }

    /// Write an extra client option file and include it after the global defaults
    pub fn add_extra_defaults_file(mut self, name: &str, contents: &str) -> Self {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write extra defaults file");
        self.config.mysql_client.defaults_extra_file.push(path);
        self
    }

    /// Include an option file that does not exist
    pub fn add_missing_defaults_file(mut self, name: &str) -> Self {
        let path = self.temp_dir.path().join(name);
        self.config.mysql_client.defaults_extra_file.push(path);
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the global defaults path
    pub fn global_defaults(&self) -> &Path {
        &self.config.xtrabackup.global_defaults
    }

    /// Build the raw configuration and keep its temp directory alive
    pub fn persist(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }

    /// Build and resolve the configuration
    pub fn effective(self) -> (EffectiveConfig, TempDir) {
        let effective = resolve(&self.config).expect("Test configuration should resolve");
        (effective, self.temp_dir)
    }

    /// Serialize the configuration as a backupset TOML file
    pub fn write_toml(self, name: &str) -> (PathBuf, TempDir) {
        let path = self.temp_dir.path().join(name);
        let contents =
            toml::to_string_pretty(&self.config).expect("Failed to serialize test config");
        fs::write(&path, contents).expect("Failed to write test config");
        (path, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
