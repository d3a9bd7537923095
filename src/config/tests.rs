use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{Transport, load_config_from};
use crate::broker::Framing;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 7878);
    assert_eq!(settings.server.transport, Transport::Tcp);
    assert_eq!(settings.broker.max_connections, 1000);
    assert_eq!(settings.broker.max_line_bytes, 4096);
    assert_eq!(settings.broker.framing, Framing::Prefixed);
    assert_eq!(settings.broker.idle_timeout(), None);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.addr(), "127.0.0.1:7878");
    assert_eq!(cfg.broker.outbound_queue, 256);
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000
        transport = "udp"

        [broker]
        max_connections = 10
        framing = "raw"
        idle_timeout_secs = 30
    "#;
    fs::write(tmp.path().join("default.toml"), toml).expect("write config file");
    let path = tmp.path().join("default");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.transport, Transport::Udp);
    assert_eq!(cfg.broker.max_connections, 10);
    assert_eq!(cfg.broker.framing, Framing::Raw);
    assert_eq!(cfg.broker.idle_timeout(), Some(Duration::from_secs(30)));
    // untouched keys keep their defaults
    assert_eq!(cfg.broker.max_line_bytes, 4096);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(tmp.path().join("default.toml"), "[server]\nport = 9000\n")
        .expect("write config file");
    let path = tmp.path().join("default");

    temp_env::with_vars(
        [
            ("PUBLINE_SERVER__PORT", Some("9100")),
            ("PUBLINE_BROKER__MAX_CONNECTIONS", Some("3")),
            ("PUBLINE_BROKER__FRAMING", Some("json")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.broker.max_connections, 3);
            assert_eq!(cfg.broker.framing, Framing::Json);
        },
    );
}

#[test]
#[serial]
fn test_zero_queue_is_raised_and_zero_timeout_disables() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(
        tmp.path().join("default.toml"),
        "[broker]\noutbound_queue = 0\nmax_topic_bytes = 0\nidle_timeout_secs = 0\n",
    )
    .expect("write config file");
    let path = tmp.path().join("default");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.broker.outbound_queue, 1);
    assert_eq!(cfg.broker.max_topic_bytes, 1);
    assert_eq!(cfg.broker.idle_timeout(), None);
}
