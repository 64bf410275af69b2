//! Utilities for running helper commands with proper error handling and timeouts
//!
//! Processes are supervised on a current-thread tokio runtime created for
//! each invocation, so callers stay synchronous while still getting
//! deadline support.

use crate::error::{BackupError, Result};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tracing::debug;

/// How a process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited normally with the given code
    Exited(i32),
    /// Terminated by a signal
    Signaled,
    /// Killed after exceeding its deadline
    TimedOut(Duration),
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        status
            .code()
            .map(ExitOutcome::Exited)
            .unwrap_or(ExitOutcome::Signaled)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exited with failure status [{}]", code),
            ExitOutcome::Signaled => write!(f, "was terminated by a signal"),
            ExitOutcome::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
        }
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub outcome: ExitOutcome,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// All output lines, stdout first, then stderr
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&self.stderr).lines())
            .map(|l| l.to_string())
            .collect()
    }
}

/// Build the runtime used to supervise child processes
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BackupError::io("Failed to start process supervisor", e))
}

/// Render an argument vector as a shell-style command line
pub fn display_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() {
                "\"\"".to_string()
            } else if arg.contains(|c: char| c.is_whitespace() || c == '"') {
                format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command with optional timeout, capturing its output
///
/// Only a failure to start the process is an error; the exit outcome is
/// returned for the caller to classify.
pub fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running command: {} {}", program, args.join(" "));

    let runtime = runtime()?;
    runtime.block_on(async {
        let child = cmd.spawn().map_err(|source| BackupError::ProcessLaunch {
            program: program.to_string(),
            source,
        })?;

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Ok(CommandOutput {
                        outcome: ExitOutcome::TimedOut(limit),
                        stdout: Vec::new(),
                        stderr: Vec::new(),
                    })
                }
            },
            None => child.wait_with_output().await,
        };

        let output =
            waited.map_err(|e| BackupError::io(format!("Failed to wait for {}", program), e))?;

        Ok::<_, BackupError>(CommandOutput {
            outcome: ExitOutcome::from(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    })
}

/// Run a shell command (used for hooks)
pub fn run_shell_command(
    command: &str,
    envs: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    debug!("Running shell command: {}", command);

    #[cfg(unix)]
    let (shell, flag) = ("sh", "-c");

    #[cfg(windows)]
    let (shell, flag) = ("cmd", "/C");

    run_command(shell, &[flag.to_string(), command.to_string()], envs, timeout)
}
