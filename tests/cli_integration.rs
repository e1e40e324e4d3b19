//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use webterm_bridge::cli::{parse_args_from, Args};
use webterm_bridge::config::Config;
use webterm_bridge::SpawnMode;

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("webterm-bridge")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.host.is_none());
    assert!(result.port.is_none());
    assert!(result.config.is_none());
    assert!(result.script.is_none());
    assert!(!result.pty);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-H", "0.0.0.0", "-p", "8080", "-s", "atm.py", "-r", "/srv", "--pty", "-l", "debug",
    ]))
    .unwrap();

    assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
    assert_eq!(result.port, Some(8080));
    assert_eq!(result.script, Some(PathBuf::from("atm.py")));
    assert_eq!(result.root, Some(PathBuf::from("/srv")));
    assert!(result.pty);
    assert_eq!(result.log_level, Some("debug".to_string()));
}

#[test]
fn test_cli_missing_value() {
    assert!(parse_args_from(args(&["--port"])).is_err());
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn test_file_then_args() {
    let file = config_file(
        r#"{
            "server": { "host": "0.0.0.0", "port": 7000 },
            "bridge": { "script": "from_file.py", "root_dir": "/opt/app" }
        }"#,
    );

    let mut config = Config::from_file(file.path()).unwrap();
    config.apply_args(&Args {
        port: Some(7100),
        script: Some(PathBuf::from("from_cli.py")),
        ..Args::default()
    });

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 7100);
    assert_eq!(config.bridge.script, PathBuf::from("from_cli.py"));
    assert_eq!(config.bridge.root_dir, PathBuf::from("/opt/app"));
}

#[test]
fn test_load_missing_file_fails() {
    let result = Config::load(&Args {
        config: Some(PathBuf::from("/nonexistent/webterm.json")),
        ..Args::default()
    });
    assert!(result.is_err());
}

#[test]
fn test_pty_flag_overrides_file() {
    let file = config_file(r#"{ "bridge": { "spawn_mode": "pipe" } }"#);

    let mut config = Config::from_file(file.path()).unwrap();
    config.apply_args(&parse_args_from(args(&["--pty"])).unwrap());

    assert_eq!(config.bridge.spawn_mode, SpawnMode::Pty);
}

#[test]
fn test_server_config_from_file() {
    let file = config_file(r#"{ "server": { "port": 8443, "graceful_shutdown": false } }"#);

    let server = Config::from_file(file.path())
        .unwrap()
        .to_server_config()
        .unwrap();

    assert_eq!(server.bind_address(), "127.0.0.1:8443");
    assert!(!server.graceful_shutdown);
}

#[test]
fn test_build_bridge_uses_target() {
    let file = config_file(r#"{ "bridge": { "script": "main.py", "root_dir": "app" } }"#);

    let bridge = Config::from_file(file.path()).unwrap().build_bridge();
    assert_eq!(
        bridge.target().script_path(),
        PathBuf::from("app").join("main.py")
    );
}
