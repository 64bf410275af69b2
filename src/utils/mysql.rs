//! Minimal MySQL client used by the size estimate
//!
//! Queries go through the `mysql` command-line client, authenticated with
//! the generated defaults file so the estimate sees the same credentials as
//! the backup itself.

use super::command::display_command;
use super::executor::CommandExecutor;
use crate::config::{ConfigError, MysqlClientConfig};
use crate::error::{BackupError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An open session against the server
pub trait MysqlClient {
    /// Value of a global server variable
    fn show_variable(&mut self, name: &str) -> Result<String>;

    /// End the session
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens client sessions
pub trait MysqlConnector: Send + Sync {
    fn connect(
        &self,
        client: &MysqlClientConfig,
        defaults_file: &Path,
    ) -> Result<Box<dyn MysqlClient>>;
}

/// Connector backed by the `mysql` command-line client
pub struct CliConnector {
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl CliConnector {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }
}

impl MysqlConnector for CliConnector {
    fn connect(
        &self,
        client: &MysqlClientConfig,
        defaults_file: &Path,
    ) -> Result<Box<dyn MysqlClient>> {
        let program = which::which(&client.mysql).map_err(|e| BackupError::ProcessLaunch {
            program: client.mysql.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, e.to_string()),
        })?;
        debug!("Using mysql client {:?}", program);

        Ok(Box::new(CliClient {
            executor: Arc::clone(&self.executor),
            program: program.display().to_string(),
            defaults_file: defaults_file.to_path_buf(),
            timeout: self.timeout,
        }))
    }
}

struct CliClient {
    executor: Arc<dyn CommandExecutor>,
    program: String,
    defaults_file: PathBuf,
    timeout: Option<Duration>,
}

impl MysqlClient for CliClient {
    fn show_variable(&mut self, name: &str) -> Result<String> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid server variable name: {:?}",
                name
            ))
            .into());
        }

        let args = vec![
            format!("--defaults-file={}", self.defaults_file.display()),
            "--batch".to_string(),
            "--skip-column-names".to_string(),
            format!("--execute=SHOW GLOBAL VARIABLES LIKE '{}'", name),
        ];
        let output = self.executor.run_command(&self.program, &args, self.timeout)?;

        let mut command = vec![self.program.clone()];
        command.extend_from_slice(&args);
        if !output.outcome.success() {
            return Err(BackupError::ProcessExecution {
                command: display_command(&command),
                outcome: output.outcome,
                output: output.lines(),
            });
        }

        let stdout = output.stdout_str();
        stdout
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim_end().to_string())
            .ok_or_else(|| BackupError::ProcessExecution {
                command: display_command(&command),
                outcome: output.outcome,
                output: vec![format!("Server variable {} not found", name)],
            })
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Each query is its own process; nothing stays open
        Ok(())
    }
}
