//! Driving the xtrabackup tool
//!
//! Covers the version probe, argument assembly, the `--help` self-check used
//! by dry runs, the main backup process and the log-apply step.

use super::command::{display_command, runtime, ExitOutcome};
use super::executor::CommandExecutor;
use super::streams::{LogSink, OutputSink};
use crate::config::{ConfigError, XtrabackupSettings};
use crate::error::{BackupError, Result};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tracing::{debug, info, warn};

/// Exit code `xtrabackup --help` reports when the option file parses
pub const HELP_EXIT_CODE: i32 = 1;

/// Placeholder in `tmpdir` replaced by the backup directory
const BACKUP_DIRECTORY_PLACEHOLDER: &str = "{backup_directory}";

const CHUNK_SIZE: usize = 64 * 1024;

/// Which generation of the tool drives the backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// `xtrabackup --backup --target-dir=...` (releases after 8.0.0)
    Binary,
    /// `innobackupex ... <directory>`
    Legacy,
}

/// Result of the dry-run self-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfCheck {
    MatchedExpectedCode,
    UnexpectedCode {
        command: String,
        outcome: ExitOutcome,
        output: Vec<String>,
    },
}

/// Extract `[major, minor, patch]` from `xtrabackup --version` output
pub fn parse_version(output: &str) -> Option<[u32; 3]> {
    let mut tokens = output.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "version" {
            continue;
        }
        let candidate = tokens.next()?;
        let numeric: String = candidate
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = [0u32; 3];
        let mut found = 0;
        for (slot, part) in parts.iter_mut().zip(numeric.split('.')) {
            if part.is_empty() {
                break;
            }
            *slot = part.parse().ok()?;
            found += 1;
        }
        if found > 0 {
            return Some(parts);
        }
    }
    None
}

pub fn mode_for_version(version: [u32; 3]) -> ToolMode {
    if version > [8, 0, 0] {
        ToolMode::Binary
    } else {
        ToolMode::Legacy
    }
}

/// Probe the installed tool and pick the invocation style
pub fn detect_mode(
    executor: &dyn CommandExecutor,
    xtrabackup: &str,
    timeout: Option<Duration>,
) -> Result<ToolMode> {
    let output = executor.run_command(xtrabackup, &["--version".to_string()], timeout)?;
    let text = output.lines().join("\n");

    match parse_version(&text) {
        Some(version) => {
            let mode = mode_for_version(version);
            debug!(
                "Detected xtrabackup {}.{}.{}, using {:?} mode",
                version[0], version[1], version[2], mode
            );
            Ok(mode)
        }
        None => {
            warn!(
                "Unable to determine xtrabackup version from {:?}, assuming innobackupex",
                text.trim()
            );
            Ok(ToolMode::Legacy)
        }
    }
}

/// Resolve the temporary directory for a backup
pub fn evaluate_tmpdir(tmpdir: Option<&str>, backup_directory: &Path) -> String {
    let directory = backup_directory.display().to_string();
    match tmpdir {
        Some(template) => template.replace(BACKUP_DIRECTORY_PLACEHOLDER, &directory),
        None => directory,
    }
}

/// Assemble the full command line for the backup process
pub fn build_xb_args(
    settings: &XtrabackupSettings,
    target_directory: &Path,
    defaults_path: &Path,
    mode: ToolMode,
) -> Vec<String> {
    let program = match mode {
        ToolMode::Binary => settings.xtrabackup.clone(),
        ToolMode::Legacy => settings.innobackupex.clone(),
    };
    let mut args = vec![program, format!("--defaults-file={}", defaults_path.display())];

    if mode == ToolMode::Binary {
        args.push("--backup".to_string());
    }
    if let Some(ibbackup) = &settings.ibbackup {
        args.push(format!("--ibbackup={}", ibbackup));
    }

    let backup_directory = match settings.stream.as_arg() {
        Some(stream) => {
            args.push(format!("--stream={}", stream));
            target_directory.to_path_buf()
        }
        None => target_directory.join("data"),
    };

    let tmpdir = evaluate_tmpdir(settings.tmpdir.as_deref(), target_directory);
    if !tmpdir.is_empty() {
        args.push(format!("--tmpdir={}", tmpdir));
    }
    if settings.slave_info {
        args.push("--slave-info".to_string());
    }
    if settings.safe_slave_backup {
        args.push("--safe-slave-backup".to_string());
    }
    if settings.no_lock {
        args.push("--no-lock".to_string());
    }

    match mode {
        ToolMode::Binary => args.push(format!("--target-dir={}", backup_directory.display())),
        ToolMode::Legacy => args.push("--no-timestamp".to_string()),
    }

    args.extend(
        settings
            .additional_options
            .iter()
            .filter(|option| !option.trim().is_empty())
            .cloned(),
    );

    if mode == ToolMode::Legacy {
        args.push(backup_directory.display().to_string());
    }

    args
}

/// Validate the generated option file by asking the tool for `--help`
pub fn self_check(
    executor: &dyn CommandExecutor,
    xtrabackup: &str,
    defaults_path: &Path,
    timeout: Option<Duration>,
) -> Result<SelfCheck> {
    let args = vec![
        format!("--defaults-file={}", defaults_path.display()),
        "--help".to_string(),
    ];
    let mut command = vec![xtrabackup.to_string()];
    command.extend_from_slice(&args);
    let command = display_command(&command);

    info!("* Verifying generated config '{}'", defaults_path.display());
    debug!("* Verifying via command: {}", command);

    let output = executor.run_command(xtrabackup, &args, timeout)?;
    if output.outcome.code() == Some(HELP_EXIT_CODE) {
        Ok(SelfCheck::MatchedExpectedCode)
    } else {
        Ok(SelfCheck::UnexpectedCode {
            command,
            outcome: output.outcome,
            output: output.lines(),
        })
    }
}

/// Run the backup process, feeding its stdout into `sink` and its stderr into `log`
pub fn run_xtrabackup(
    args: &[String],
    sink: &mut OutputSink,
    log: &LogSink,
    timeout: Option<Duration>,
) -> Result<()> {
    let (program, rest) = args.split_first().ok_or_else(|| {
        BackupError::from(ConfigError::ValidationError(
            "xtrabackup command line is empty".to_string(),
        ))
    })?;
    let command = display_command(args);

    info!("Executing: {}", command);
    info!("* xtrabackup output will be logged to {}", log.path().display());

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(rest)
        .stdin(Stdio::null())
        .stderr(log.stdio()?)
        .kill_on_drop(true);
    if sink.is_discard() {
        cmd.stdout(Stdio::null());
    } else {
        cmd.stdout(Stdio::piped());
    }

    let runtime = runtime()?;
    let outcome = runtime.block_on(async {
        let mut child = cmd.spawn().map_err(|source| BackupError::ProcessLaunch {
            program: program.clone(),
            source,
        })?;
        let stdout = child.stdout.take();

        let finished = match timeout {
            Some(limit) => {
                let drained =
                    tokio::time::timeout(limit, drain_and_wait(&mut child, stdout, sink)).await;
                match drained {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("{} did not finish within {:?}, killing it", program, limit);
                        stop_child(&mut child, program).await;
                        return Ok(ExitOutcome::TimedOut(limit));
                    }
                }
            }
            None => drain_and_wait(&mut child, stdout, sink).await,
        };

        if finished.is_err() {
            stop_child(&mut child, program).await;
        }
        finished
    })?;

    if outcome.success() {
        Ok(())
    } else {
        Err(BackupError::ProcessExecution {
            command,
            outcome,
            output: Vec::new(),
        })
    }
}

/// Kill the child and reap it so no zombie is left behind
async fn stop_child(child: &mut Child, program: &str) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill {}: {}", program, e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap {}: {}", program, e);
    }
}

/// Copy stdout into the sink in bounded chunks, then reap the child
async fn drain_and_wait(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    sink: &mut OutputSink,
) -> Result<ExitOutcome> {
    if let Some(mut stdout) = stdout {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let read = stdout
                .read(&mut buffer)
                .await
                .map_err(|e| BackupError::io("Failed to read xtrabackup output", e))?;
            if read == 0 {
                break;
            }
            sink.write_all(&buffer[..read])
                .map_err(|e| BackupError::io(format!("Failed to write {}", sink.description()), e))?;
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| BackupError::io("Failed to wait for xtrabackup", e))?;
    Ok(ExitOutcome::from(status))
}

/// Prepare a non-streamed backup in place
///
/// Returns `false` when the step was skipped because the backup is an
/// archive.
pub fn apply_logs(
    executor: &dyn CommandExecutor,
    settings: &XtrabackupSettings,
    target_directory: &Path,
    mode: ToolMode,
    timeout: Option<Duration>,
) -> Result<bool> {
    if settings.stream.is_streaming() {
        info!("Skipping --apply-logs since backup is streamed");
        return Ok(false);
    }

    let data_directory = target_directory.join("data");
    let (program, args) = match mode {
        ToolMode::Binary => (
            settings.xtrabackup.as_str(),
            vec![
                "--prepare".to_string(),
                format!("--target-dir={}", data_directory.display()),
            ],
        ),
        ToolMode::Legacy => (
            settings.innobackupex.as_str(),
            vec![
                "--apply-log".to_string(),
                data_directory.display().to_string(),
            ],
        ),
    };
    let mut command = vec![program.to_string()];
    command.extend_from_slice(&args);
    let command = display_command(&command);

    info!("Executing: {}", command);
    let output = executor.run_command(program, &args, timeout)?;
    for line in output.lines() {
        info!(" >> {}", line);
    }

    if !output.outcome.success() {
        return Err(BackupError::ProcessExecution {
            command,
            outcome: output.outcome,
            output: output.lines(),
        });
    }

    Ok(true)
}
