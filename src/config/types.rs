use crate::utils::streams::StreamMethod;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure (raw, before resolution)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub xtrabackup: XtrabackupConfig,

    #[serde(default)]
    pub mysql_client: MysqlClientConfig,

    #[serde(default)]
    pub compression: CompressionConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Options for the xtrabackup tool itself
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct XtrabackupConfig {
    /// Server option file included ahead of any client option files
    #[serde(default = "default_global_defaults")]
    pub global_defaults: PathBuf,

    /// xtrabackup binary (also used for the version probe and self-check)
    #[serde(default = "default_xtrabackup")]
    pub xtrabackup: String,

    /// innobackupex wrapper used by pre-8.0 releases
    #[serde(default = "default_innobackupex")]
    pub innobackupex: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibbackup: Option<String>,

    /// Stream method: tar, xbstream or none
    #[serde(default = "default_stream")]
    pub stream: String,

    #[serde(default = "default_true")]
    pub apply_logs: bool,

    #[serde(default)]
    pub slave_info: bool,

    #[serde(default)]
    pub safe_slave_backup: bool,

    #[serde(default)]
    pub no_lock: bool,

    /// Temporary directory; `{backup_directory}` expands to the target directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmpdir: Option<String>,

    /// Extra arguments passed verbatim to the tool
    #[serde(default)]
    pub additional_options: Vec<String>,

    /// Shell command run before the backup starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_command: Option<String>,

    /// Deadline for each external command (unset waits indefinitely)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Run the advisory size estimate before backing up
    #[serde(default = "default_true")]
    pub estimate_size: bool,
}

impl Default for XtrabackupConfig {
    fn default() -> Self {
        Self {
            global_defaults: default_global_defaults(),
            xtrabackup: default_xtrabackup(),
            innobackupex: default_innobackupex(),
            ibbackup: None,
            stream: default_stream(),
            apply_logs: true,
            slave_info: false,
            safe_slave_backup: false,
            no_lock: false,
            tmpdir: None,
            additional_options: Vec::new(),
            pre_command: None,
            timeout_seconds: None,
            estimate_size: true,
        }
    }
}

/// Client connection options written to the generated defaults file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MysqlClientConfig {
    /// Option files included after the global defaults, in order
    #[serde(default)]
    pub defaults_extra_file: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// mysql command-line client used to query server variables
    #[serde(default = "default_mysql")]
    pub mysql: String,
}

impl Default for MysqlClientConfig {
    fn default() -> Self {
        Self {
            defaults_extra_file: Vec::new(),
            user: None,
            password: None,
            socket: None,
            host: None,
            port: None,
            mysql: default_mysql(),
        }
    }
}

/// Compression applied to streamed archives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompressionConfig {
    #[serde(default)]
    pub method: CompressionMethod,

    #[serde(default = "default_compression_level")]
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            method: CompressionMethod::default(),
            level: default_compression_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    None,
    #[default]
    Gzip,
    Bzip2,
    Zstd,
}

/// Logging settings used by the command-line front end
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoggingSection {
    /// Directory for rotated log files (console only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

/// Resolved configuration (after layer merging and validation)
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub xtrabackup: XtrabackupSettings,
    pub mysql_client: MysqlClientConfig,
    pub compression: CompressionConfig,
}

/// Typed xtrabackup options
#[derive(Debug, Clone)]
pub struct XtrabackupSettings {
    pub global_defaults: PathBuf,
    pub xtrabackup: String,
    pub innobackupex: String,
    pub ibbackup: Option<String>,
    pub stream: StreamMethod,
    pub apply_logs: bool,
    pub slave_info: bool,
    pub safe_slave_backup: bool,
    pub no_lock: bool,
    pub tmpdir: Option<String>,
    pub additional_options: Vec<String>,
    pub pre_command: Option<String>,
    pub timeout: Option<Duration>,
    pub estimate_size: bool,
}

// Default value functions

fn default_global_defaults() -> PathBuf { PathBuf::from("/etc/my.cnf") }
fn default_xtrabackup() -> String { "xtrabackup".to_string() }
fn default_innobackupex() -> String { "innobackupex".to_string() }
fn default_stream() -> String { "tar".to_string() }
fn default_true() -> bool { true }
fn default_mysql() -> String { "mysql".to_string() }
fn default_compression_level() -> u32 { 1 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
