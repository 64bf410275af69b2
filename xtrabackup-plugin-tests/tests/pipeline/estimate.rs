//! Size estimates through a fake mysql client

use serial_test::serial;
use test_utils::{
    BackupPlugin, ConfigBuilder, ErrorKind, FakeTool, ResultAssertions, TestContext,
    XtrabackupPlugin,
};
use xtrabackup_plugin::BackupManager;

#[test]
#[serial]
fn test_estimate_sums_reported_datadir() {
    let ctx = TestContext::new();
    let datadir = ctx.create_subdir("mysql");
    ctx.create_file("mysql/ibdata1", &[0u8; 4096]);
    ctx.create_file("mysql/shop/orders.ibd", &[0u8; 1000]);
    ctx.create_file("mysql/shop/db.opt", b"default-character-set=utf8mb4\n");
    let mysql = ctx.install_mysql(&datadir);

    let (config, _config_dir) = ConfigBuilder::new()
        .with_mysql(&mysql)
        .with_client("backup", "secret")
        .effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let size = plugin.estimate_backup_size().assert_ok();

    assert_eq!(size, 4096 + 1000 + 30);

    let calls = ctx.invocations("mysql");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with(&format!(
        "--defaults-file={}",
        plugin.defaults_path().display()
    )));
    assert!(calls[0].contains("SHOW GLOBAL VARIABLES LIKE 'datadir'"));
}

#[test]
#[serial]
fn test_estimate_missing_datadir_is_io_error() {
    let ctx = TestContext::new();
    let mysql = ctx.install_mysql(&ctx.temp_dir().join("gone"));
    let (config, _config_dir) = ConfigBuilder::new().with_mysql(&mysql).effective();

    let plugin = XtrabackupPlugin::new("nightly", config, ctx.target_dir(), false).assert_ok();
    let err = plugin.estimate_backup_size().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("gone"));
}

#[test]
#[serial]
fn test_manager_runs_estimate_before_backup() {
    let ctx = TestContext::new();
    let datadir = ctx.create_subdir("mysql");
    ctx.create_file("mysql/ibdata1", &[0u8; 2048]);
    let mysql = ctx.install_mysql(&datadir);
    let xtrabackup = ctx.install_tool("xtrabackup", &FakeTool::xtrabackup("8.0.35"));

    let (config, _config_dir) = ConfigBuilder::new()
        .with_xtrabackup(&xtrabackup)
        .with_mysql(&mysql)
        .with_stream("tar")
        .with_estimate_size(true)
        .effective();

    let target = ctx.target_dir().join("nightly");
    let report = BackupManager::new(config)
        .run("nightly", &target, false)
        .assert_ok();

    assert_eq!(report.archive, Some(target.join("backup.tar.gz")));
    assert_eq!(ctx.invocations("mysql").len(), 1);
}
