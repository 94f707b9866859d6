#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use gimptrack_client::config::{self, TransportKind};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
collector:
  url: "ws://127.0.0.1:8080/v1/ws"
send:
  inventroy: false # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
collector:
  url: "ws://127.0.0.1:8080/v1/ws"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.collector.connect_on_login);
    assert_eq!(cfg.collector.password, "");
    assert_eq!(
        cfg.collector.transports,
        vec![TransportKind::Websocket, TransportKind::Polling]
    );
    assert!(cfg.send.data && cfg.send.inventory && cfg.send.energy);
}

#[test]
fn toggles_and_transports_parse() {
    let ok = r#"
version: 1
collector:
  url: "wss://tracker.example.com/v1/ws"
  password: "hunter2"
  connect_on_login: false
  transports: [polling]
send:
  skills: false
  prayer: false
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.collector.password, "hunter2");
    assert!(!cfg.collector.connect_on_login);
    assert_eq!(cfg.collector.transports, vec![TransportKind::Polling]);
    assert!(!cfg.send.skills);
    assert!(!cfg.send.prayer);
    assert!(cfg.send.health);
}

#[test]
fn reject_out_of_range_timeouts() {
    let bad = r#"
version: 1
collector:
  url: "ws://127.0.0.1:8080/v1/ws"
  handshake_timeout_ms: 10
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");

    let bad = r#"
version: 1
collector:
  url: "ws://127.0.0.1:8080/v1/ws"
  transports: []
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn reject_unknown_version() {
    let bad = r#"
version: 2
collector:
  url: "ws://127.0.0.1:8080/v1/ws"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn malformed_url_still_loads() {
    let ok = r#"
version: 1
collector:
  url: "not a url"
"#;
    assert!(config::load_from_str(ok).is_ok());
}
