//! Full backup runs against fake xtrabackup scripts

use flate2::read::GzDecoder;
use serial_test::serial;
use std::fs::File;
use std::io::Read;
use test_utils::{
    capture_logs, BackupError, BackupPlugin, CompressionMethod, ConfigBuilder, ErrorKind,
    FakeTool, ResultAssertions, TestContext, XtrabackupPlugin,
};
use xtrabackup_plugin::utils::command::ExitOutcome;

#[test]
#[serial]
fn test_directory_backup_succeeds_without_archive() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("none")
        .with_client("backup", "secret")
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let report = plugin.backup().assert_ok();

    assert!(!report.dry_run);
    assert!(report.archive.is_none());
    assert!(report.logs_applied);
    assert!(ctx.target_file_exists("data/xtrabackup_checkpoints"));
    assert!(!ctx.target_file_exists("backup.tar"));
    assert!(!ctx.target_file_exists("backup.tar.gz"));

    let defaults = ctx.read_target_file("my.cnf").unwrap();
    assert!(defaults.contains("[client]\nuser = backup\n"));
    assert!(defaults.ends_with(&format!(
        "[xtrabackup]\ntmpdir = {}\n",
        ctx.target_dir().display()
    )));

    let calls = ctx.invocations("xtrabackup");
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], "--version");
    assert!(calls[1].starts_with("--defaults-file="));
    assert!(calls[1].contains("--backup"));
    assert!(!calls[1].contains("--stream"));
    assert!(calls[1].ends_with(&format!(
        "--target-dir={}",
        ctx.target_dir().join("data").display()
    )));
    assert!(calls[2].starts_with("--prepare"));

    let log = ctx.read_target_file("xtrabackup.log").unwrap();
    assert!(log.contains("xtrabackup: completed OK!"));
}

#[test]
#[serial]
fn test_streamed_failure_surfaces_tool_log() {
    let ctx = TestContext::new();
    let tool = FakeTool::xtrabackup("8.0.35").failing_backup(
        1,
        &[
            "xtrabackup: Starting to backup non-InnoDB tables",
            "InnoDB: Operating system error number 28 in a file operation",
        ],
    );
    let xtrabackup = ctx.install_tool("xtrabackup", &tool);
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("tar")
        .with_compression(CompressionMethod::Gzip, 1)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let (result, logs) = capture_logs(|| plugin.backup());

    match result {
        Err(BackupError::ProcessExecution { outcome, output, .. }) => {
            assert_eq!(outcome, ExitOutcome::Exited(1));
            assert_eq!(
                output,
                vec![
                    "xtrabackup: Starting to backup non-InnoDB tables",
                    "InnoDB: Operating system error number 28 in a file operation",
                ]
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // Every log line is replayed at error level
    let errors = logs.errors();
    assert!(errors
        .iter()
        .any(|l| l.contains("    ! xtrabackup: Starting to backup non-InnoDB tables")));
    assert!(errors
        .iter()
        .any(|l| l.contains("    ! InnoDB: Operating system error number 28")));

    // The partial archive is closed properly and left behind
    let mut archived = String::new();
    GzDecoder::new(File::open(ctx.target_dir().join("backup.tar.gz")).unwrap())
        .read_to_string(&mut archived)
        .unwrap();
    assert_eq!(archived, "FAKE-ARCHIVE-DATA");

    assert!(!ctx
        .invocations("xtrabackup")
        .iter()
        .any(|call| call.contains("--prepare")));
}

#[test]
#[serial]
fn test_log_apply_failure_keeps_backup() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool(
        "xtrabackup",
        &FakeTool::xtrabackup("8.0.35").with_prepare_exit(1),
    );
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("none")
        .with_apply_logs(true)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let err = plugin.backup().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DependentStep);
    assert!(err.backup_captured());
    assert!(err.to_string().contains("apply-logs"));
    assert_eq!(err.output(), ["xtrabackup: preparing backup".to_string()]);
    assert!(ctx.target_file_exists("data/xtrabackup_checkpoints"));
}

#[test]
#[serial]
fn test_streamed_backup_skips_log_apply() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("xbstream")
        .with_compression(CompressionMethod::Zstd, 3)
        .with_apply_logs(true)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let report = plugin.backup().assert_ok();

    assert_eq!(report.archive, Some(ctx.target_dir().join("backup.xb.zst")));
    assert!(!report.logs_applied);
    assert!(ctx.target_file_exists("backup.xb.zst"));

    let calls = ctx.invocations("xtrabackup");
    assert!(calls[1].contains("--stream=xbstream"));
    assert!(!calls.iter().any(|call| call.contains("--prepare")));
}

#[test]
#[serial]
fn test_uncompressed_tar_archive() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("tar")
        .with_compression(CompressionMethod::None, 0)
        .with_apply_logs(false)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    plugin.backup().assert_ok();

    assert_eq!(ctx.read_target_file("backup.tar").unwrap(), "FAKE-ARCHIVE-DATA");
}

#[test]
#[serial]
fn test_legacy_innobackupex_run() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("2.4.29"));
    let innobackupex = ctx.install_tool("innobackupex", &FakeTool::innobackupex());
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_innobackupex(&innobackupex)
        .with_stream("none")
        .with_tmpdir("{backup_directory}/tmp")
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let report = plugin.backup().assert_ok();
    assert!(report.logs_applied);

    let data = ctx.target_dir().join("data");
    let calls = ctx.invocations("innobackupex");
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains(&format!("--tmpdir={}/tmp", ctx.target_dir().display())));
    assert!(calls[0].ends_with(&format!("--no-timestamp {}", data.display())));
    assert_eq!(calls[1], format!("--apply-log {}", data.display()));
    assert!(ctx.target_file_exists("data/xtrabackup_checkpoints"));

    // Only the version probe went to xtrabackup itself
    assert_eq!(ctx.invocations("xtrabackup"), vec!["--version"]);
}

#[test]
#[serial]
fn test_deadline_stops_hung_backup() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35").with_sleep(10));
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("none")
        .with_timeout(1)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let started = std::time::Instant::now();
    let err = plugin.backup().unwrap_err();

    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    match err {
        BackupError::ProcessExecution { outcome, .. } => {
            assert!(matches!(outcome, ExitOutcome::TimedOut(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!ctx.target_file_exists("data/xtrabackup_checkpoints"));
}
