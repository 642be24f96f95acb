//! Global tracing subscriber installation
//!
//! Installing a subscriber is process-wide, so this binary holds the only
//! test that calls `init_tracing`.

use panel_common::config::LoggingConfig;
use panel_common::logging::init_tracing;
use panel_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_init_tracing_writes_file_and_refuses_second_install() {
    env::remove_var("RUST_LOG");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("panel-ir.log");
    let config = LoggingConfig {
        level: "debug".to_string(),
        file: Some(path.clone()),
    };

    init_tracing(&config).unwrap();
    tracing::info!(circuits = 42, "Schedule assembled for log check");

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("Schedule assembled for log check"));
    assert!(written.contains("circuits=42"));
    assert!(!written.contains('\u{1b}'));

    let err = init_tracing(&LoggingConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("Tracing already initialised")));
}
