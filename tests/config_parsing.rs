use std::time::Duration;

use nodetrack::config::Config;
use nodetrack::network::TcpTransport;

#[test]
fn defaults_apply_when_empty() {
    let cfg = Config::from_toml("").unwrap();
    assert_eq!(cfg.tracker_bind(), "0.0.0.0:7090");
    assert_eq!(cfg.ttl(), Duration::from_secs(300));
    assert_eq!(cfg.sweep_interval(), Duration::from_secs(60));
    assert_eq!(cfg.agent_address(), "127.0.0.1:7092");
    assert_eq!(cfg.agent_bind(), "127.0.0.1:7092");
    assert_eq!(cfg.tracker_address(), "127.0.0.1:7090");
    assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
    assert_eq!(cfg.max_sessions(), 1024);
    assert_eq!(cfg.heartbeat(), None);
    assert_eq!(cfg.spool_dir(), "_nodes");
    assert!(cfg.submit_on_start());
    assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.max_line_bytes(), 1024 * 1024);
}

#[test]
fn file_values_override_defaults() {
    let cfg = Config::from_toml(
        r#"
        [tracker]
        bind = "127.0.0.1:7190"
        ttl_secs = 30
        sweep_interval_secs = 5

        [agent]
        address = "10.0.0.4:7092"
        bind = "0.0.0.0:7092"
        tracker = "10.0.0.1:7190"
        poll_interval_ms = 100
        max_sessions = 4
        heartbeat_secs = 60
        submit_on_start = false

        [network]
        request_timeout_ms = 250
        max_line_bytes = 4096

        [logging]
        disable_console = true
        console_level = "warn"
        "#,
    )
    .unwrap();
    assert_eq!(cfg.tracker_bind(), "127.0.0.1:7190");
    assert_eq!(cfg.ttl(), Duration::from_secs(30));
    assert_eq!(cfg.sweep_interval(), Duration::from_secs(5));
    assert_eq!(cfg.agent_address(), "10.0.0.4:7092");
    assert_eq!(cfg.agent_bind(), "0.0.0.0:7092");
    assert_eq!(cfg.tracker_address(), "10.0.0.1:7190");
    assert_eq!(cfg.max_sessions(), 4);
    assert_eq!(cfg.heartbeat(), Some(Duration::from_secs(60)));
    assert!(!cfg.submit_on_start());
    assert_eq!(cfg.request_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.max_line_bytes(), 4096);
    assert_eq!(TcpTransport::from_config(&cfg).timeout(), Duration::from_millis(250));
    assert_eq!(cfg.logging.unwrap().disable_console, Some(true));
}

#[test]
fn cli_setters_win() {
    let mut cfg = Config::from_toml("[agent]\naddress = \"1.1.1.1:1\"").unwrap();
    cfg.set_agent_address("2.2.2.2:2".into());
    cfg.set_ttl_secs(10);
    assert_eq!(cfg.agent_address(), "2.2.2.2:2");
    assert_eq!(cfg.ttl(), Duration::from_secs(10));
}

#[test]
fn missing_file_is_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let loaded = Config::load(&tmp.path().join("absent.toml")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn malformed_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "[tracker\nttl_secs = ").unwrap();
    assert!(Config::load(&path).is_err());
}
