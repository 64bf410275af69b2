//! Dry runs and launch failures

use serial_test::serial;
use test_utils::{
    capture_logs, BackupPlugin, ConfigBuilder, ErrorKind, FakeTool, ResultAssertions,
    TestContext, XtrabackupPlugin,
};

#[test]
#[serial]
fn test_missing_binary_touches_no_sinks() {
    let ctx = TestContext::new();
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&ctx.missing_tool("xtrabackup"))
        .with_stream("tar")
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let err = plugin.backup().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProcessLaunch);
    assert!(!err.backup_captured());
    assert!(!ctx.target_file_exists("xtrabackup.log"));
    assert!(!ctx.target_file_exists("backup.tar.gz"));
    // The option file is written at construction time
    assert!(ctx.target_file_exists("my.cnf"));
}

#[test]
#[serial]
fn test_dry_run_writes_nothing_but_defaults() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_stream("tar")
        .with_pre_command("touch ${backup_directory}/pre-marker")
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), true).assert_ok();
    let (result, logs) = capture_logs(|| plugin.backup());

    let report = result.assert_ok();
    assert!(report.dry_run);
    assert!(report.archive.is_none());
    assert!(logs.contains("* xtrabackup command:"));
    assert!(logs.contains("* Verifying generated config"));

    let calls = ctx.invocations("xtrabackup");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "--version");
    assert_eq!(
        calls[1],
        format!("--defaults-file={} --help", plugin.defaults_path().display())
    );

    assert!(!ctx.target_file_exists("backup.tar.gz"));
    assert!(!ctx.target_file_exists("xtrabackup.log"));
    assert!(!ctx.target_file_exists("pre-marker"));

    // No tool section is appended on a dry run
    let defaults = ctx.read_target_file("my.cnf").unwrap();
    assert!(!defaults.contains("[xtrabackup]"));
}

#[test]
#[serial]
fn test_dry_run_rejects_unexpected_help_code() {
    let ctx = TestContext::new();
    let xtrabackup = ctx.install_tool(
        "xtrabackup",
        &FakeTool::xtrabackup("8.0.35").with_help_exit(0),
    );
    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), true).assert_ok();
    let (result, logs) = capture_logs(|| plugin.backup());

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessExecution);
    assert_eq!(err.output(), ["Usage: xtrabackup [OPTIONS]".to_string()]);
    assert!(logs
        .errors()
        .iter()
        .any(|l| l.contains("! Usage: xtrabackup [OPTIONS]")));
}
