#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde_json::json;

use gimptrack_client::session::{ConnectionListener, Notification, SessionManager};
use gimptrack_core::{protocol::SysFrame, AuthState, ConnectionState};

use scripted::{assert_quiet, data, eventually, options, session, until, Behavior, ScriptedConnector};

use Notification::{Error, Status};

#[tokio::test]
async fn authorized_flow_sends_connect_packet() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    let seen = until(&mut rx, Error(AuthState::Authorized)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::Authorized),
        ]
    );
    assert!(s.is_connected());
    assert!(s.is_authorized());
    assert!(s.is_first_packet());

    s.send_data("connect", json!({ "name": "Zezima", "world": 302 }));
    assert!(!s.is_first_packet());
    eventually(|| collector.sent().len() == 1).await;

    let sent = collector.sent();
    assert_eq!(sent[0].svc, "tracker");
    assert_eq!(sent[0].msg_type, "connect");
    assert_eq!(data(&sent[0])["name"], "Zezima");
    assert_eq!(collector.credentials(), vec!["hunter2".to_string()]);
}

#[tokio::test]
async fn invalid_credential_reports_unauthorized_then_disconnects() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("letmein"), &collector);

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::Unauthorized),
            Status(ConnectionState::Disconnecting),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert_eq!(s.auth_state(), AuthState::Unauthorized);
    assert_quiet(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn reconnect_after_rejection_clears_error_first() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("letmein"), &collector);

    s.connect();
    until(&mut rx, Status(ConnectionState::Disconnected)).await;

    s.set_socket_builder_options(false, None, "hunter2");
    assert_eq!(s.connection_state(), ConnectionState::Disconnected);

    s.connect();
    let seen = until(&mut rx, Error(AuthState::Authorized)).await;
    assert_eq!(
        seen,
        vec![
            Error(AuthState::None),
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::Authorized),
        ]
    );
}

#[tokio::test]
async fn disconnect_while_disconnected_is_a_noop() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.disconnect();
    assert_eq!(s.connection_state(), ConnectionState::Disconnected);
    assert_quiet(&mut rx, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn connect_is_idempotent_while_active() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;
    s.connect();

    assert_quiet(&mut rx, Duration::from_millis(100)).await;
    assert_eq!(collector.credentials().len(), 1);
}

#[tokio::test]
async fn disconnect_during_handshake_never_reports_connected() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            open_delay: Duration::from_millis(100),
            ..Behavior::default()
        },
    );
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    s.disconnect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Disconnecting),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
    assert!(!s.is_connected());
}

#[tokio::test]
async fn unparseable_url_is_bad_url() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let mut opts = options("hunter2");
    opts.url = "collector at home".into();
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Error(AuthState::BadUrl),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert!(collector.credentials().is_empty());
}

#[tokio::test]
async fn handshake_timeout_reports_timed_out() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            open_hangs: true,
            ..Behavior::default()
        },
    );
    let mut opts = options("hunter2");
    opts.handshake_timeout = Duration::from_millis(150);
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Error(AuthState::TimedOut),
            Status(ConnectionState::Disconnected),
        ]
    );
}

#[tokio::test]
async fn unanswered_credential_times_out() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            silent_auth: true,
            ..Behavior::default()
        },
    );
    let mut opts = options("hunter2");
    opts.handshake_timeout = Duration::from_millis(150);
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::TimedOut),
            Status(ConnectionState::Disconnected),
        ]
    );
}

#[tokio::test]
async fn refused_connection_is_lost_connection() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            open_fails: true,
            ..Behavior::default()
        },
    );
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Connecting),
            Error(AuthState::LostConnection),
            Status(ConnectionState::Disconnected),
        ]
    );
}

#[tokio::test]
async fn collector_hangup_is_lost_connection() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    collector.drop_link();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Error(AuthState::LostConnection),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert!(!s.is_authorized());
}

#[tokio::test]
async fn collector_revoking_credential_mid_session() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    // Non-credential errors are logged and the session stays up.
    collector.push_frame(
        SysFrame::Error {
            code: "RATE_LIMITED".into(),
            msg: "slow down".into(),
        }
        .into_envelope(),
    );
    assert_quiet(&mut rx, Duration::from_millis(100)).await;
    assert!(s.is_authorized());

    collector.push_frame(
        SysFrame::Error {
            code: "AUTH_FAILED".into(),
            msg: "group password changed".into(),
        }
        .into_envelope(),
    );
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Error(AuthState::Unauthorized),
            Status(ConnectionState::Disconnecting),
            Status(ConnectionState::Disconnected),
        ]
    );
}

#[tokio::test]
async fn clean_disconnect_clears_authorization() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    s.disconnect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Disconnecting),
            Error(AuthState::None),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert_eq!(s.auth_state(), AuthState::None);
}

#[tokio::test]
async fn stuck_teardown_is_bounded() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            close_hangs: true,
            ..Behavior::default()
        },
    );
    let mut opts = options("hunter2");
    opts.teardown_timeout = Duration::from_millis(100);
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    s.disconnect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Disconnecting),
            Error(AuthState::LostConnection),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn connect_during_teardown_waits_for_disconnected() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            close_hangs: true,
            ..Behavior::default()
        },
    );
    let mut opts = options("hunter2");
    opts.teardown_timeout = Duration::from_millis(100);
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    s.disconnect();
    s.connect();
    assert_eq!(s.connection_state(), ConnectionState::Disconnecting);

    let seen = until(&mut rx, Error(AuthState::Authorized)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Disconnecting),
            Error(AuthState::LostConnection),
            Status(ConnectionState::Disconnected),
            Error(AuthState::None),
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::Authorized),
        ]
    );
    assert_eq!(collector.credentials().len(), 2);
}

#[tokio::test]
async fn disconnect_cancels_connect_queued_during_teardown() {
    let collector = ScriptedConnector::with_behavior(
        &["hunter2"],
        Behavior {
            close_hangs: true,
            ..Behavior::default()
        },
    );
    let mut opts = options("hunter2");
    opts.teardown_timeout = Duration::from_millis(100);
    let (s, mut rx) = session(opts, &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    s.disconnect();
    s.connect();
    s.disconnect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Disconnecting),
            Error(AuthState::LostConnection),
            Status(ConnectionState::Disconnected),
        ]
    );
    assert_quiet(&mut rx, Duration::from_millis(500)).await;
    assert_eq!(collector.credentials().len(), 1);
}

#[tokio::test]
async fn forced_reconnect_uses_new_credential() {
    let collector = ScriptedConnector::accepting(&["hunter2", "swordfish"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;

    s.set_socket_builder_options(true, None, "swordfish");
    let seen = until(&mut rx, Error(AuthState::Authorized)).await;
    assert_eq!(
        seen,
        vec![
            Status(ConnectionState::Disconnecting),
            Error(AuthState::None),
            Status(ConnectionState::Disconnected),
            Status(ConnectionState::Connecting),
            Status(ConnectionState::Connected),
            Error(AuthState::Authorized),
        ]
    );
    assert_eq!(
        collector.credentials(),
        vec!["hunter2".to_string(), "swordfish".to_string()]
    );
}

#[tokio::test]
async fn new_options_without_force_wait_for_next_connect() {
    let collector = ScriptedConnector::accepting(&["hunter2", "swordfish"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.set_socket_builder_options(true, Some(Duration::from_millis(300)), "swordfish");
    assert_quiet(&mut rx, Duration::from_millis(50)).await;

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;
    assert_eq!(collector.credentials(), vec!["swordfish".to_string()]);
}

#[tokio::test]
async fn send_while_disconnected_is_swallowed() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);

    s.send_data("update", json!({ "health": 50 }));
    assert_quiet(&mut rx, Duration::from_millis(50)).await;

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;
    s.send_data("update", json!({ "health": 51 }));
    eventually(|| collector.sent().len() == 1).await;
    assert_eq!(data(&collector.sent()[0])["health"], 51);
}

/// Disconnects from inside its own CONNECTED callback.
#[derive(Default)]
struct HangUpOnConnect {
    session: OnceLock<SessionManager>,
    seen: Mutex<Vec<Notification>>,
}

impl ConnectionListener for HangUpOnConnect {
    fn on_connection_status_changed(&self, status: ConnectionState) {
        self.seen.lock().unwrap().push(Status(status));
        if status == ConnectionState::Connected {
            self.session.get().unwrap().disconnect();
        }
    }

    fn on_connection_error_changed(&self, error: AuthState) {
        self.seen.lock().unwrap().push(Error(error));
    }
}

#[tokio::test]
async fn listener_may_call_back_into_the_session() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);
    let hang_up = Arc::new(HangUpOnConnect::default());
    assert!(hang_up.session.set(s.clone()).is_ok());
    s.add_connection_listener(hang_up.clone());

    s.connect();
    let seen = until(&mut rx, Status(ConnectionState::Disconnected)).await;
    let expected = vec![
        Status(ConnectionState::Connecting),
        Status(ConnectionState::Connected),
        Status(ConnectionState::Disconnecting),
        Status(ConnectionState::Disconnected),
    ];
    assert_eq!(seen, expected);
    assert_eq!(*hang_up.seen.lock().unwrap(), expected);
}

struct Tagged {
    tag: &'static str,
    log: Arc<Mutex<Vec<(&'static str, ConnectionState)>>>,
}

impl ConnectionListener for Tagged {
    fn on_connection_status_changed(&self, status: ConnectionState) {
        self.log.lock().unwrap().push((self.tag, status));
    }
}

#[tokio::test]
async fn listeners_run_in_registration_order() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);
    let log = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
        s.add_connection_listener(Arc::new(Tagged {
            tag,
            log: Arc::clone(&log),
        }));
    }

    s.connect();
    until(&mut rx, Error(AuthState::Authorized)).await;
    eventually(|| log.lock().unwrap().len() == 4).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("first", ConnectionState::Connecting),
            ("second", ConnectionState::Connecting),
            ("first", ConnectionState::Connected),
            ("second", ConnectionState::Connected),
        ]
    );
}

/// Holds the delivering thread inside its CONNECTED callback.
#[derive(Default)]
struct SlowOnConnect {
    entered: AtomicBool,
    log: Mutex<Vec<ConnectionState>>,
}

impl ConnectionListener for SlowOnConnect {
    fn on_connection_status_changed(&self, status: ConnectionState) {
        self.log.lock().unwrap().push(status);
        if status == ConnectionState::Connected {
            self.entered.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transition_during_foreign_delivery_is_queued_in_order() {
    let collector = ScriptedConnector::accepting(&["hunter2"]);
    let (s, mut rx) = session(options("hunter2"), &collector);
    let slow = Arc::new(SlowOnConnect::default());
    s.add_connection_listener(slow.clone());

    s.connect();
    eventually(|| slow.entered.load(Ordering::SeqCst)).await;

    // The transport task is still inside the CONNECTED callback, so this
    // transition is left for that task to deliver.
    s.disconnect();
    assert_eq!(s.connection_state(), ConnectionState::Disconnecting);
    assert!(!slow.log.lock().unwrap().contains(&ConnectionState::Disconnecting));

    until(&mut rx, Status(ConnectionState::Disconnected)).await;
    eventually(|| slow.log.lock().unwrap().len() == 4).await;
    assert_eq!(
        *slow.log.lock().unwrap(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
        ]
    );
}
