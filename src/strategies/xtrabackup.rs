//! XtraBackup plugin
//!
//! Handles:
//! - Generating the per-job defaults file
//! - Dry runs validated through `xtrabackup --help`
//! - Streamed and directory backups, with optional compression
//! - Pre-command and log-apply steps
//! - Size estimates from the server's data directory

use super::{BackupPlugin, BackupReport};
use crate::config::EffectiveConfig;
use crate::error::{BackupError, Result};
use crate::utils::command::display_command;
use crate::utils::defaults_file::{add_tool_defaults, generate_defaults_file, DEFAULTS_FILE_NAME};
use crate::utils::executor::{CommandExecutor, RealExecutor};
use crate::utils::mysql::{CliConnector, MysqlConnector};
use crate::utils::streams::{open_data_sink, open_log_sink, settle, LogSink, OutputSink};
use crate::utils::xtrabackup::{
    apply_logs, build_xb_args, detect_mode, evaluate_tmpdir, run_xtrabackup, self_check,
    SelfCheck, ToolMode,
};
use crate::utils::{disk, hooks};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, info_span, Span};

pub struct XtrabackupPlugin {
    name: String,
    config: EffectiveConfig,
    target_directory: PathBuf,
    dry_run: bool,
    defaults_path: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    connector: Arc<dyn MysqlConnector>,
    span: Span,
}

impl XtrabackupPlugin {
    /// Create a plugin that runs the real tools
    ///
    /// Writes `my.cnf` into the target directory, which must exist.
    pub fn new(
        name: impl Into<String>,
        config: EffectiveConfig,
        target_directory: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Result<Self> {
        Self::with_executor(
            name,
            config,
            target_directory,
            dry_run,
            Arc::new(RealExecutor::new()),
        )
    }

    /// Create a plugin with a custom command executor (for testing)
    pub fn with_executor(
        name: impl Into<String>,
        config: EffectiveConfig,
        target_directory: impl Into<PathBuf>,
        dry_run: bool,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let connector = Arc::new(CliConnector::new(
            Arc::clone(&executor),
            config.xtrabackup.timeout,
        ));
        Self::with_collaborators(name, config, target_directory, dry_run, executor, connector)
    }

    /// Create a plugin with custom executor and MySQL connector
    pub fn with_collaborators(
        name: impl Into<String>,
        config: EffectiveConfig,
        target_directory: impl Into<PathBuf>,
        dry_run: bool,
        executor: Arc<dyn CommandExecutor>,
        connector: Arc<dyn MysqlConnector>,
    ) -> Result<Self> {
        let name = name.into();
        let target_directory = target_directory.into();
        let span = info_span!(
            "backup",
            job = %name,
            target = %target_directory.display()
        );

        let defaults_path = target_directory.join(DEFAULTS_FILE_NAME);
        let mut includes = vec![config.xtrabackup.global_defaults.clone()];
        includes.extend(config.mysql_client.defaults_extra_file.iter().cloned());
        span.in_scope(|| generate_defaults_file(&defaults_path, &includes, &config.mysql_client))?;

        Ok(Self {
            name,
            config,
            target_directory,
            dry_run,
            defaults_path,
            executor,
            connector,
            span,
        })
    }

    pub fn defaults_path(&self) -> &Path {
        &self.defaults_path
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }

    pub fn job_name(&self) -> &str {
        &self.name
    }

    /// Log the command a real run would use, then validate the option file
    fn verify_config(&self, mode: ToolMode) -> Result<()> {
        let settings = &self.config.xtrabackup;
        let args = build_xb_args(settings, &self.target_directory, &self.defaults_path, mode);
        info!("* xtrabackup command: {}", display_command(&args));

        match self_check(
            self.executor.as_ref(),
            &settings.xtrabackup,
            &self.defaults_path,
            settings.timeout,
        )? {
            SelfCheck::MatchedExpectedCode => Ok(()),
            SelfCheck::UnexpectedCode {
                command,
                outcome,
                output,
            } => {
                error!("! {} failed. Output follows below.", command);
                for line in &output {
                    error!("! {}", line);
                }
                Err(BackupError::ProcessExecution {
                    command,
                    outcome,
                    output,
                })
            }
        }
    }

    /// Open both sinks, run the tool and release the sinks on every path
    fn run_with_sinks(&self, args: &[String]) -> Result<Option<PathBuf>> {
        let settings = &self.config.xtrabackup;
        let log = open_log_sink(&self.target_directory)?;

        let sink = match open_data_sink(
            &self.target_directory,
            settings.stream,
            &self.config.compression,
        ) {
            Ok(sink) => sink,
            Err(e) => return settle(Err(e), log.close(), &self.log_description()),
        };

        self.run_into(args, sink, log)
    }

    /// Run the tool into already opened sinks, then release both
    ///
    /// A close failure is the error only when the tool succeeded.
    fn run_into(
        &self,
        args: &[String],
        mut sink: OutputSink,
        log: LogSink,
    ) -> Result<Option<PathBuf>> {
        let archive = sink.path().map(Path::to_path_buf);
        let sink_description = sink.description().to_string();

        let result = run_xtrabackup(args, &mut sink, &log, self.config.xtrabackup.timeout)
            .map_err(|e| self.report_failure(&log, e));

        let result = settle(result, sink.close(), &sink_description);
        settle(result, log.close(), &self.log_description()).map(|_| archive)
    }

    /// Surface the tool log before the error propagates
    fn report_failure(&self, log: &LogSink, err: BackupError) -> BackupError {
        info!("!! {}", err);

        let lines = match fs::read(log.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes)
                .lines()
                .map(|line| line.trim_end().to_string())
                .collect::<Vec<_>>(),
            Err(e) => {
                error!("Failed to read {}: {}", log.path().display(), e);
                Vec::new()
            }
        };
        for line in &lines {
            error!("    ! {}", line);
        }

        match err {
            BackupError::ProcessExecution {
                command, outcome, ..
            } => BackupError::ProcessExecution {
                command,
                outcome,
                output: lines,
            },
            other => other,
        }
    }

    fn log_description(&self) -> String {
        self.target_directory
            .join(crate::utils::streams::LOG_FILE_NAME)
            .display()
            .to_string()
    }
}

impl BackupPlugin for XtrabackupPlugin {
    fn estimate_backup_size(&self) -> Result<u64> {
        let _enter = self.span.enter();

        let mut client = self
            .connector
            .connect(&self.config.mysql_client, &self.defaults_path)?;
        let size = client
            .show_variable("datadir")
            .and_then(|datadir| {
                info!("Estimating size of datadir {}", datadir);
                disk::directory_size(Path::new(&datadir))
            });

        settle(size, client.close(), "mysql connection")
    }

    fn backup(&self) -> Result<BackupReport> {
        let _enter = self.span.enter();
        let started_at = Utc::now();
        let settings = &self.config.xtrabackup;

        let mode = detect_mode(self.executor.as_ref(), &settings.xtrabackup, settings.timeout)?;

        if self.dry_run {
            self.verify_config(mode)?;
            return Ok(BackupReport {
                name: self.name.clone(),
                target_directory: self.target_directory.clone(),
                dry_run: true,
                archive: None,
                logs_applied: false,
                started_at,
                finished_at: Utc::now(),
            });
        }

        let tmpdir = evaluate_tmpdir(settings.tmpdir.as_deref(), &self.target_directory);
        add_tool_defaults(&self.defaults_path, "xtrabackup", &[("tmpdir", Some(tmpdir))])?;

        let args = build_xb_args(settings, &self.target_directory, &self.defaults_path, mode);
        hooks::execute_pre_command(
            self.executor.as_ref(),
            settings.pre_command.as_deref(),
            &self.target_directory,
            settings.timeout,
        )?;

        let archive = self.run_with_sinks(&args)?;

        let logs_applied = if settings.apply_logs {
            apply_logs(
                self.executor.as_ref(),
                settings,
                &self.target_directory,
                mode,
                settings.timeout,
            )
            .map_err(|e| BackupError::DependentStep {
                step: "apply-logs".to_string(),
                backup_directory: self.target_directory.clone(),
                source: Box::new(e),
            })?
        } else {
            false
        };

        Ok(BackupReport {
            name: self.name.clone(),
            target_directory: self.target_directory.clone(),
            dry_run: false,
            archive,
            logs_applied,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn name(&self) -> &'static str {
        "xtrabackup"
    }
}
