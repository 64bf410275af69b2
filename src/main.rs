use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use xtrabackup_plugin::config::{self, Config, EffectiveConfig};
use xtrabackup_plugin::managers::backup::format_size;
use xtrabackup_plugin::managers::logging::{self, LoggingConfig};
use xtrabackup_plugin::{BackupError, BackupManager};

#[derive(Parser)]
#[command(name = "xtrabackup-plugin")]
#[command(about = "Backup plugin wrapping Percona XtraBackup", long_about = None)]
#[command(version)]
struct Cli {
    /// Global defaults file, applied before the backupset configuration
    #[arg(short, long, global = true)]
    global_config: Option<PathBuf>,

    /// Directory for rotated log files (overrides [logging] directory)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backup into a target directory
    Backup {
        /// Backupset configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Directory that receives my.cnf, xtrabackup.log and the backup data
        #[arg(short, long)]
        target_dir: PathBuf,

        /// Validate the generated configuration without backing up
        #[arg(long)]
        dry_run: bool,

        /// Override a setting, e.g. --set xtrabackup.stream=xbstream
        #[arg(long = "set", value_name = "SECTION.KEY=VALUE")]
        overrides: Vec<String>,

        /// Job name used in logs (defaults to the target directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Estimate the size of a backup from the server's data directory
    Estimate {
        /// Backupset configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Directory that receives the generated my.cnf
        #[arg(short, long)]
        target_dir: PathBuf,

        /// Override a setting, e.g. --set mysql-client.host=db1
        #[arg(long = "set", value_name = "SECTION.KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Validate configuration files
    Validate {
        /// Backupset configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override a setting
        #[arg(long = "set", value_name = "SECTION.KEY=VALUE")]
        overrides: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let captured = e
                .downcast_ref::<BackupError>()
                .map(BackupError::backup_captured)
                .unwrap_or(false);
            if captured {
                eprintln!("Backup data was captured; only a post-processing step failed.");
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate { config, overrides } => {
            logging::init_console_logging();
            let (_, effective) = load(cli.global_config.as_deref(), &config, &overrides)?;

            println!("✓ Configuration is valid");
            println!("  stream:      {:?}", effective.xtrabackup.stream);
            println!(
                "  compression: {:?} (level {})",
                effective.compression.method, effective.compression.level
            );
            println!(
                "  apply-logs:  {}",
                if effective.xtrabackup.apply_logs { "yes" } else { "no" }
            );
            Ok(())
        }

        Commands::Backup {
            config,
            target_dir,
            dry_run,
            overrides,
            name,
        } => {
            let (raw, effective) = load(cli.global_config.as_deref(), &config, &overrides)?;
            let _log_guard = init_logging(&raw, cli.log_dir, cli.verbose)?;

            let name = name.unwrap_or_else(|| job_name(&target_dir));
            let manager = BackupManager::new(effective);
            let report = manager.run(&name, &target_dir, dry_run)?;

            if report.dry_run {
                println!("✓ Dry run completed successfully");
            } else {
                println!("✓ Backup completed successfully");
                if let Some(archive) = report.archive {
                    println!("  archive: {}", archive.display());
                }
            }
            Ok(())
        }

        Commands::Estimate {
            config,
            target_dir,
            overrides,
        } => {
            let (raw, effective) = load(cli.global_config.as_deref(), &config, &overrides)?;
            let _log_guard = init_logging(&raw, cli.log_dir, cli.verbose)?;

            let manager = BackupManager::new(effective);
            let bytes = manager.estimate(&job_name(&target_dir), &target_dir)?;
            println!("{} ({} bytes)", format_size(bytes), bytes);
            Ok(())
        }
    }
}

/// Load the configuration layers and resolve them
fn load(
    global: Option<&Path>,
    backupset: &Path,
    overrides: &[String],
) -> Result<(Config, EffectiveConfig)> {
    let mut layers = Vec::new();
    if let Some(global) = global {
        layers.push(global);
    }
    layers.push(backupset);

    let raw = config::load_layered(&layers, overrides)
        .with_context(|| format!("Failed to load configuration {}", backupset.display()))?;
    let effective = config::resolve(&raw)?;
    Ok((raw, effective))
}

fn init_logging(
    raw: &Config,
    log_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<logging::LogGuard> {
    let mut logging_config = LoggingConfig::from_config(&raw.logging, verbose);
    if log_dir.is_some() {
        logging_config.log_directory = log_dir;
    }
    logging::init_logging(&logging_config)
}

fn job_name(target_dir: &Path) -> String {
    target_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "default".to_string())
}
