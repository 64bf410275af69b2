//! Error types for the backup pipeline
//!
//! Every failure a job can hit is one of five kinds. Callers use
//! [`BackupError::kind`] and [`BackupError::backup_captured`] to tell
//! "no backup was produced" apart from "backup data exists, but a step
//! that depends on it failed".

use crate::config::ConfigError;
use crate::utils::command::ExitOutcome;
use std::io;
use std::path::PathBuf;

/// Coarse classification of a [`BackupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing option, unknown stream method, unusable defaults file
    Configuration,
    /// A sink or file could not be opened, written or closed
    Io,
    /// The external binary could not be started
    ProcessLaunch,
    /// The external binary ran and reported failure
    ProcessExecution,
    /// The primary backup succeeded but a post-processing step failed
    DependentStep,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to execute {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} {outcome}")]
    ProcessExecution {
        command: String,
        outcome: ExitOutcome,
        /// Captured tool output, one entry per line
        output: Vec<String>,
    },

    #[error("Backup data was captured in {backup_directory:?}, but {step} failed: {source}")]
    DependentStep {
        step: String,
        backup_directory: PathBuf,
        #[source]
        source: Box<BackupError>,
    },
}

pub type Result<T> = std::result::Result<T, BackupError>;

impl BackupError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BackupError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::Config(_) => ErrorKind::Configuration,
            BackupError::Io { .. } => ErrorKind::Io,
            BackupError::ProcessLaunch { .. } => ErrorKind::ProcessLaunch,
            BackupError::ProcessExecution { .. } => ErrorKind::ProcessExecution,
            BackupError::DependentStep { .. } => ErrorKind::DependentStep,
        }
    }

    /// True when the backup artifact was produced and left on disk
    pub fn backup_captured(&self) -> bool {
        matches!(self, BackupError::DependentStep { .. })
    }

    /// Output captured from the failing process, if any
    pub fn output(&self) -> &[String] {
        match self {
            BackupError::ProcessExecution { output, .. } => output,
            BackupError::DependentStep { source, .. } => source.output(),
            _ => &[],
        }
    }
}
