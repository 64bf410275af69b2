//! Tests for the generated my.cnf

use std::sync::Arc;
use test_utils::{ConfigBuilder, ErrorKind, MockExecutor, TestContext, XtrabackupPlugin};
use xtrabackup_plugin::utils::defaults_file::add_tool_defaults;

#[test]
fn test_includes_then_client_section() {
    let ctx = TestContext::new();
    let builder = ConfigBuilder::new()
        .add_extra_defaults_file("client.cnf", "[client]\nuser = fallback\n")
        .add_extra_defaults_file("site.cnf", "[client]\nsocket = /run/mysqld.sock\n")
        .with_client("backup", "p#ss word");
    let global = builder.global_defaults().to_path_buf();
    let client_cnf = builder.temp_dir().join("client.cnf");
    let site_cnf = builder.temp_dir().join("site.cnf");
    let (config, _config_dir) = builder.effective();

    let plugin = XtrabackupPlugin::with_executor(
        "nightly",
        config,
        ctx.target_dir(),
        false,
        Arc::new(MockExecutor::new()),
    )
    .unwrap();

    let contents = std::fs::read_to_string(plugin.defaults_path()).unwrap();
    assert_eq!(
        contents,
        format!(
            "!include {}\n!include {}\n!include {}\n[client]\nuser = backup\npassword = \"p#ss word\"\n",
            global.display(),
            client_cnf.display(),
            site_cnf.display()
        )
    );
}

#[test]
fn test_missing_include_is_configuration_error() {
    let ctx = TestContext::new();
    let (config, _config_dir) = ConfigBuilder::new()
        .add_missing_defaults_file("absent.cnf")
        .effective();

    let result = XtrabackupPlugin::with_executor(
        "nightly",
        config,
        ctx.target_dir(),
        false,
        Arc::new(MockExecutor::new()),
    );

    let err = result.err().expect("construction should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("absent.cnf"));
}

#[test]
fn test_append_twice_keeps_both_sections() {
    let ctx = TestContext::new();
    let (config, _config_dir) = ConfigBuilder::new().with_client("backup", "secret").effective();
    let plugin = XtrabackupPlugin::with_executor(
        "nightly",
        config,
        ctx.target_dir(),
        false,
        Arc::new(MockExecutor::new()),
    )
    .unwrap();

    add_tool_defaults(
        plugin.defaults_path(),
        "xtrabackup",
        &[("tmpdir", Some("/var/tmp".to_string()))],
    )
    .unwrap();
    add_tool_defaults(
        plugin.defaults_path(),
        "xtrabackup",
        &[("parallel", Some("4".to_string())), ("tmpdir", None)],
    )
    .unwrap();

    let contents = std::fs::read_to_string(plugin.defaults_path()).unwrap();
    assert_eq!(contents.matches("user = backup").count(), 1);
    assert_eq!(contents.matches("tmpdir = /var/tmp").count(), 1);
    assert!(contents.ends_with("[xtrabackup]\nparallel = 4\n"));
}
