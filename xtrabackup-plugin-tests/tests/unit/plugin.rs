//! Plugin behaviour with mocked helper commands

use std::sync::Arc;
use test_utils::{
    capture_logs, version_banner, BackupPlugin, ConfigBuilder, ErrorKind, MockExecutor,
    MockResponse, ResultAssertions, TestContext, XtrabackupPlugin,
};
use xtrabackup_plugin::BackupManager;

fn dry_run_plugin(ctx: &TestContext, executor: &MockExecutor) -> (XtrabackupPlugin, tempfile::TempDir) {
    let (config, config_dir) = ConfigBuilder::new()
        .with_stream("none")
        .with_additional_options(&["--parallel=2"])
        .effective();
    let plugin = XtrabackupPlugin::with_executor(
        "nightly",
        config,
        ctx.target_dir(),
        true,
        Arc::new(executor.clone()),
    )
    .assert_ok();
    (plugin, config_dir)
}

#[test]
fn test_dry_run_logs_legacy_command() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("xtrabackup", "--version", MockResponse::success(&version_banner("2.4.29")))
        .expect_with_arg("xtrabackup", "--help", MockResponse::exit(1, "Usage"));
    let (plugin, _config_dir) = dry_run_plugin(&ctx, &executor);

    let (result, logs) = capture_logs(|| plugin.backup());

    let report = result.assert_ok();
    assert!(report.dry_run);
    assert!(logs.contains("* xtrabackup command: innobackupex --defaults-file="));
    assert!(logs.contains("--no-timestamp --parallel=2"));
    assert!(logs.contains(&format!("{}", ctx.target_dir().join("data").display())));
    assert!(logs.errors().is_empty());
}

#[test]
fn test_dry_run_logs_binary_command() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("xtrabackup", "--version", MockResponse::success(&version_banner("8.0.35")))
        .expect_with_arg("xtrabackup", "--help", MockResponse::exit(1, "Usage"));
    let (plugin, _config_dir) = dry_run_plugin(&ctx, &executor);

    let (result, logs) = capture_logs(|| plugin.backup());

    result.assert_ok();
    assert!(logs.contains("* xtrabackup command: xtrabackup --defaults-file="));
    assert!(logs.contains("--backup"));
}

#[test]
fn test_dry_run_unexpected_code_logs_output() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("xtrabackup", "--version", MockResponse::success(&version_banner("8.0.35")))
        .expect_with_arg(
            "xtrabackup",
            "--help",
            MockResponse::exit(2, "xtrabackup: unknown variable 'foo=bar'"),
        );
    let (plugin, _config_dir) = dry_run_plugin(&ctx, &executor);

    let (result, logs) = capture_logs(|| plugin.backup());

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessExecution);
    assert!(err.to_string().contains("exited with failure status [2]"));
    assert!(logs
        .errors()
        .iter()
        .any(|l| l.contains("! xtrabackup: unknown variable 'foo=bar'")));
    assert!(!executor.was_called_with("--prepare"));
}

#[test]
fn test_manager_skips_estimate_on_dry_run() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("xtrabackup", "--version", MockResponse::success(&version_banner("8.0.35")))
        .expect_with_arg("xtrabackup", "--help", MockResponse::exit(1, "Usage"));
    let (config, _config_dir) = ConfigBuilder::new().with_estimate_size(true).effective();

    let manager = BackupManager::with_executor(config, Arc::new(executor.clone()));
    manager.run("nightly", ctx.target_dir(), true).assert_ok();

    assert_eq!(executor.get_calls().len(), 2);
}

#[test]
fn test_manager_estimate_failure_is_advisory() {
    let ctx = TestContext::new();
    let executor = MockExecutor::new()
        .expect_with_arg("xtrabackup", "--version", MockResponse::NotFound);
    let (config, _config_dir) = ConfigBuilder::new()
        .with_estimate_size(true)
        .with_mysql(&ctx.missing_tool("mysql"))
        .effective();

    let manager = BackupManager::with_executor(config, Arc::new(executor));
    let (result, logs) = capture_logs(|| manager.run("nightly", ctx.target_dir(), false));

    // The estimate warning is logged, then the missing tool stops the job
    assert!(logs.contains("Size estimate failed"));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ProcessLaunch);
}
