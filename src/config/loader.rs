use super::types::*;
use super::expand_tilde;
use crate::utils::streams::StreamMethod;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::{Table, Value};

/// Highest compression level accepted for any codec
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid override '{0}': expected section.key=value")]
    InvalidOverride(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown stream method '{0}'")]
    UnknownStreamMethod(String),

    #[error("Option file does not exist: {0:?}")]
    IncludeNotFound(PathBuf),

    #[error("Failed to write defaults file {path:?}: {source}")]
    DefaultsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load a single configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    load_layered(&[path.as_ref()], &[])
}

/// Load configuration layers and per-run overrides
///
/// Layers are merged in order, later tables overriding keys of earlier ones.
/// Overrides (`section.key=value`) are applied last.
pub fn load_layered(layers: &[&Path], overrides: &[String]) -> Result<Config> {
    let mut merged = Table::new();

    for path in layers {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let layer: Table = toml::from_str(&contents)?;
        merge_tables(&mut merged, layer);
    }

    for assignment in overrides {
        apply_override(&mut merged, assignment)?;
    }

    let config: Config = Value::Table(merged).try_into()?;
    Ok(config)
}

/// Recursively merge `overlay` into `base`
pub fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply a `section.key=value` override to a configuration table
///
/// The value is read as a TOML value when it parses as one (`true`, `3306`,
/// `["--parallel=4"]`) and as a plain string otherwise.
pub fn apply_override(table: &mut Table, assignment: &str) -> Result<()> {
    let (path, raw) = assignment
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(assignment.to_string()))?;

    let keys: Vec<&str> = path.trim().split('.').collect();
    if keys.len() < 2 || keys.iter().any(|k| k.is_empty()) {
        return Err(ConfigError::InvalidOverride(assignment.to_string()));
    }

    let value = parse_override_value(raw.trim());

    let (last, parents) = keys
        .split_last()
        .ok_or_else(|| ConfigError::InvalidOverride(assignment.to_string()))?;

    let mut current = table;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(inner) => inner,
            _ => return Err(ConfigError::InvalidOverride(assignment.to_string())),
        };
    }
    current.insert(last.to_string(), value);

    Ok(())
}

fn parse_override_value(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Validate the configuration and produce its typed, immutable form
pub fn resolve(config: &Config) -> Result<EffectiveConfig> {
    let xb = &config.xtrabackup;

    let stream: StreamMethod = xb.stream.parse()?;

    if xb.xtrabackup.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "xtrabackup binary must not be empty".to_string(),
        ));
    }

    if xb.innobackupex.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "innobackupex binary must not be empty".to_string(),
        ));
    }

    if xb.timeout_seconds == Some(0) {
        return Err(ConfigError::ValidationError(
            "timeout-seconds must be greater than zero".to_string(),
        ));
    }

    if config.compression.level > MAX_COMPRESSION_LEVEL {
        return Err(ConfigError::ValidationError(format!(
            "compression level {} is out of range (0-{})",
            config.compression.level, MAX_COMPRESSION_LEVEL
        )));
    }

    let mut mysql_client = config.mysql_client.clone();
    mysql_client.defaults_extra_file = mysql_client
        .defaults_extra_file
        .iter()
        .map(|p| expand_tilde(p))
        .collect();

    Ok(EffectiveConfig {
        xtrabackup: XtrabackupSettings {
            global_defaults: expand_tilde(&xb.global_defaults),
            xtrabackup: xb.xtrabackup.clone(),
            innobackupex: xb.innobackupex.clone(),
            ibbackup: xb.ibbackup.clone().filter(|s| !s.is_empty()),
            stream,
            apply_logs: xb.apply_logs,
            slave_info: xb.slave_info,
            safe_slave_backup: xb.safe_slave_backup,
            no_lock: xb.no_lock,
            tmpdir: xb.tmpdir.clone().filter(|s| !s.is_empty()),
            additional_options: xb.additional_options.clone(),
            pre_command: xb.pre_command.clone().filter(|s| !s.trim().is_empty()),
            timeout: xb.timeout_seconds.map(Duration::from_secs),
            estimate_size: xb.estimate_size,
        },
        mysql_client,
        compression: config.compression.clone(),
    })
}
