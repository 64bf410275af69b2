//! Pre-backup shell command

use super::command::ExitOutcome;
use super::executor::CommandExecutor;
use crate::error::{BackupError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Variables a pre-command may reference
const DIRECTORY_VARIABLES: [&str; 2] = ["backup_directory", "backupdir"];

/// Replace `$backup_directory`, `${backup_directory}`, `$backupdir` and
/// `${backupdir}` with the target directory
///
/// `$$` is an escaped dollar sign. Other references are left untouched.
pub fn substitute_backup_directory(command: &str, backup_directory: &Path) -> String {
    let directory = backup_directory.display().to_string();
    let mut result = String::with_capacity(command.len());
    let mut rest = command;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            result.push('$');
            rest = stripped;
            continue;
        }

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        if consumed > 0 && DIRECTORY_VARIABLES.contains(&name) {
            result.push_str(&directory);
            rest = &after[consumed..];
        } else {
            result.push('$');
            rest = after;
        }
    }

    result.push_str(rest);
    result
}

/// Run the configured pre-command, if any
pub fn execute_pre_command(
    executor: &dyn CommandExecutor,
    pre_command: Option<&str>,
    backup_directory: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    let command = match pre_command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => command,
        None => return Ok(()),
    };

    let command = substitute_backup_directory(command, backup_directory);
    info!("Executing: {}", command);

    let envs = vec![(
        "BACKUP_DIRECTORY".to_string(),
        backup_directory.display().to_string(),
    )];
    let output = executor.run_shell_command(&command, &envs, timeout)?;
    for line in output.lines() {
        info!(" >> {}", line);
    }

    match output.outcome {
        ExitOutcome::Exited(0) => Ok(()),
        outcome => Err(BackupError::ProcessExecution {
            command,
            outcome,
            output: output.lines(),
        }),
    }
}
