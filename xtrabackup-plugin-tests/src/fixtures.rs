//! Test fixtures and fake tool scripts
//!
//! Fake tools are POSIX shell scripts that mimic the parts of xtrabackup,
//! innobackupex and the mysql client the plugin relies on. Every invocation
//! appends its arguments to an args log so tests can check what ran.

/// Script template for a fake xtrabackup or innobackupex
const TOOL_TEMPLATE: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "@ARGS_LOG@"
for arg in "$@"; do
  case "$arg" in
    --version)
      echo "@NAME@ version @VERSION@ based on MySQL server @VERSION@ Linux (x86_64)" >&2
      exit 0 ;;
    --help)
      echo "Usage: @NAME@ [OPTIONS]"
      exit @HELP_EXIT@ ;;
    --prepare|--apply-log)
      echo "@NAME@: preparing backup"
      exit @PREPARE_EXIT@ ;;
  esac
done
stream=""
target=""
last=""
for arg in "$@"; do
  case "$arg" in
    --stream=*) stream="${arg#--stream=}" ;;
    --target-dir=*) target="${arg#--target-dir=}" ;;
  esac
  last="$arg"
done
@SLEEP@
@STDERR@
if [ -n "$stream" ]; then
  printf '%s' "@PAYLOAD@"
else
  if [ -z "$target" ]; then
    target="$last"
  fi
  mkdir -p "$target"
  echo "backup_type = full-backuped" > "$target/xtrabackup_checkpoints"
fi
exit @BACKUP_EXIT@
"#;

/// Script template for a fake mysql client
const MYSQL_TEMPLATE: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "@ARGS_LOG@"
printf 'datadir\t%s\n' "@DATADIR@"
"#;

/// Behaviour of a fake xtrabackup/innobackupex script
#[derive(Debug, Clone)]
pub struct FakeTool {
    pub name: String,
    pub version: String,
    pub help_exit: i32,
    pub prepare_exit: i32,
    pub backup_exit: i32,
    /// Lines written to stderr during the backup
    pub stderr_lines: Vec<String>,
    /// Data written to stdout when streaming
    pub payload: String,
    /// Seconds to sleep before backing up
    pub sleep_seconds: Option<u32>,
}

impl FakeTool {
    /// A well-behaved xtrabackup of the given version
    pub fn xtrabackup(version: &str) -> Self {
        Self {
            name: "xtrabackup".to_string(),
            version: version.to_string(),
            help_exit: 1,
            prepare_exit: 0,
            backup_exit: 0,
            stderr_lines: vec![
                "xtrabackup: recognized server arguments: --datadir=/var/lib/mysql".to_string(),
                "xtrabackup: completed OK!".to_string(),
            ],
            payload: "FAKE-ARCHIVE-DATA".to_string(),
            sleep_seconds: None,
        }
    }

    /// A well-behaved innobackupex wrapper
    pub fn innobackupex() -> Self {
        Self {
            name: "innobackupex".to_string(),
            ..Self::xtrabackup("2.4.29")
        }
    }

    pub fn with_help_exit(mut self, code: i32) -> Self {
        self.help_exit = code;
        self
    }

    pub fn with_prepare_exit(mut self, code: i32) -> Self {
        self.prepare_exit = code;
        self
    }

    /// Fail the backup with `code` after printing `lines` to stderr
    pub fn failing_backup(mut self, code: i32, lines: &[&str]) -> Self {
        self.backup_exit = code;
        self.stderr_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_sleep(mut self, seconds: u32) -> Self {
        self.sleep_seconds = Some(seconds);
        self
    }

    /// Render the script, recording arguments in `args_log`
    pub fn script(&self, args_log: &str) -> String {
        let stderr = self
            .stderr_lines
            .iter()
            .map(|line| format!("echo '{}' >&2", line.replace('\'', "")))
            .collect::<Vec<_>>()
            .join("\n");
        let sleep = self
            .sleep_seconds
            .map(|s| format!("sleep {}", s))
            .unwrap_or_default();

        TOOL_TEMPLATE
            .replace("@ARGS_LOG@", args_log)
            .replace("@NAME@", &self.name)
            .replace("@VERSION@", &self.version)
            .replace("@HELP_EXIT@", &self.help_exit.to_string())
            .replace("@PREPARE_EXIT@", &self.prepare_exit.to_string())
            .replace("@BACKUP_EXIT@", &self.backup_exit.to_string())
            .replace("@SLEEP@", &sleep)
            .replace("@STDERR@", &stderr)
            .replace("@PAYLOAD@", &self.payload)
    }
}

/// Render a fake mysql client reporting `datadir`
pub fn mysql_script(args_log: &str, datadir: &str) -> String {
    MYSQL_TEMPLATE
        .replace("@ARGS_LOG@", args_log)
        .replace("@DATADIR@", datadir)
}

/// `xtrabackup --version` output for a release
pub fn version_banner(version: &str) -> String {
    format!(
        "xtrabackup version {} based on MySQL server {} Linux (x86_64)",
        version, version
    )
}
