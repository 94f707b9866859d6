//! Session manager: connection lifecycle, authorization, and send gating.
//!
//! State machine:
//!
//! ```text
//! DISCONNECTED --connect()--> CONNECTING --link open--> CONNECTED
//! CONNECTED --sys/authed--> CONNECTED (AUTHORIZED)
//! CONNECTED --sys/error AUTH_FAILED--> (UNAUTHORIZED) DISCONNECTING --> DISCONNECTED
//! CONNECTING|CONNECTED --disconnect()--> DISCONNECTING --closed--> DISCONNECTED
//! any --transport error / timeout--> DISCONNECTED (auth = cause)
//! ```
//!
//! Each `connect` spawns one attempt task tagged with a generation number.
//! Results from a superseded generation are dropped, so a handshake that
//! completes after `disconnect` never announces CONNECTED.
//!
//! Errors never reach the caller. They end the attempt and surface as an
//! [`AuthState`] transition followed by DISCONNECTED.

mod attempt;
pub mod listener;
mod state;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use gimptrack_core::{
    error::{Result, TrackerError},
    protocol::Envelope,
    AuthState, ConnectionState,
};

use crate::config::{CollectorSection, SessionConfig};
use crate::transport::{self, Connector};

use attempt::Outcome;
use listener::Listeners;
use state::{Attempt, State};

pub use listener::{ChannelListener, ConnectionListener, Notification};

/// Extra time the teardown watchdog grants the attempt task before forcing
/// DISCONNECTED.
const WATCHDOG_GRACE: Duration = Duration::from_millis(250);

/// Handshake parameters. Mutable at runtime through
/// [`SessionManager::set_socket_builder_options`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub credential: String,
    pub handshake_timeout: Duration,
    pub teardown_timeout: Duration,
}

impl SessionOptions {
    pub fn from_config(cfg: &CollectorSection) -> Self {
        Self {
            url: cfg.url.clone(),
            credential: cfg.password.clone(),
            handshake_timeout: cfg.handshake_timeout(),
            teardown_timeout: cfg.teardown_timeout(),
        }
    }
}

/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    runtime: Handle,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
    listeners: Listeners,
}

impl SessionManager {
    /// Build a manager on the current tokio runtime.
    pub fn new(options: SessionOptions, connector: Arc<dyn Connector>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| TrackerError::Internal(format!("no tokio runtime: {e}")))?;
        Ok(Self::with_runtime(options, connector, runtime))
    }

    pub fn with_runtime(options: SessionOptions, connector: Arc<dyn Connector>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                connector,
                state: Mutex::new(State::new(options)),
                listeners: Listeners::default(),
            }),
        }
    }

    /// Manager using the transport chain named in the config.
    pub fn from_config(cfg: &SessionConfig) -> Result<Self> {
        let connector = transport::from_config(&cfg.collector);
        tracing::debug!(transports = ?connector.names(), "transport chain");
        Self::new(SessionOptions::from_config(&cfg.collector), Arc::new(connector))
    }

    pub fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.inner.listeners.add(listener);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.lock().connection
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.lock().auth
    }

    pub fn is_connecting(&self) -> bool {
        self.connection_state() == ConnectionState::Connecting
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn is_authorized(&self) -> bool {
        let st = self.inner.lock();
        st.connection == ConnectionState::Connected && st.auth == AuthState::Authorized
    }

    /// True from authorization until the first `send_data` after it.
    pub fn is_first_packet(&self) -> bool {
        self.inner.lock().first_packet
    }

    /// Start a session. No-op while CONNECTING or CONNECTED; while
    /// DISCONNECTING the session reconnects once DISCONNECTED is announced.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// End the session. No-op while DISCONNECTED; while DISCONNECTING it
    /// cancels a reconnect queued by `connect`.
    pub fn disconnect(&self) {
        self.inner.disconnect(false);
    }

    /// Queue one tracker packet. Dropped unless CONNECTED; never blocks.
    pub fn send_data(&self, event: &str, payload: Value) {
        let frame = match Envelope::tracker(event, payload).encode() {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(event, error = %e, "packet dropped");
                return;
            }
        };

        let mut st = self.inner.lock();
        if st.connection != ConnectionState::Connected {
            tracing::debug!(event, state = st.connection.as_str(), "send skipped: not connected");
            return;
        }
        st.first_packet = false;
        if let Some(attempt) = &st.attempt {
            if attempt.outbound.send(frame).is_err() {
                tracing::debug!(event, "send skipped: link closing");
            }
        }
    }

    /// Replace the handshake credential (and optionally the handshake
    /// timeout). With `force_reconnect`, an active session is torn down and
    /// reopened with the new options once DISCONNECTED has been announced.
    pub fn set_socket_builder_options(
        &self,
        force_reconnect: bool,
        handshake_timeout: Option<Duration>,
        credential: impl Into<String>,
    ) {
        let reconnect = {
            let mut st = self.inner.lock();
            if let Some(t) = handshake_timeout {
                st.options.handshake_timeout = t;
            }
            st.options.credential = credential.into();
            force_reconnect && st.connection.is_active()
        };
        if reconnect {
            tracing::info!("credential changed, reconnecting");
            self.inner.disconnect(true);
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand queued transitions to listeners, outside the state lock.
    ///
    /// Only one thread drains at a time. A transition queued while another
    /// thread (or a re-entrant listener) is draining is picked up by that
    /// drainer, so every notification is delivered once and in order.
    fn deliver(&self) {
        {
            let mut st = self.lock();
            if st.delivering || st.events.is_empty() {
                return;
            }
            st.delivering = true;
        }

        loop {
            let next = {
                let mut st = self.lock();
                match st.events.pop_front() {
                    Some(n) => n,
                    None => {
                        st.delivering = false;
                        return;
                    }
                }
            };
            for listener in self.listeners.snapshot() {
                next.deliver_to(listener.as_ref());
            }
        }
    }

    fn connect(self: &Arc<Self>) {
        let (generation, options, outbound, shutdown) = {
            let mut st = self.lock();
            if st.connection.is_active() {
                tracing::trace!(state = st.connection.as_str(), "connect ignored");
                return;
            }
            // The current attempt still owes its DISCONNECTED; connect after it.
            if st.connection == ConnectionState::Disconnecting {
                tracing::debug!(generation = st.generation, "connect deferred until teardown completes");
                st.reconnect_after_teardown = true;
                return;
            }

            st.generation += 1;
            let generation = st.generation;
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (stop_tx, stop_rx) = oneshot::channel();
            st.attempt = Some(Attempt {
                generation,
                outbound: out_tx,
                shutdown: Some(stop_tx),
            });
            st.reconnect_after_teardown = false;
            st.first_packet = false;
            st.set_auth(AuthState::None);
            st.set_connection(ConnectionState::Connecting);
            (generation, st.options.clone(), out_rx, stop_rx)
        };

        tracing::info!(generation, url = %options.url, "connecting");
        self.deliver();
        self.runtime
            .spawn(attempt::run(Arc::clone(self), generation, options, outbound, shutdown));
    }

    fn disconnect(self: &Arc<Self>, reconnect: bool) {
        let (generation, teardown) = {
            let mut guard = self.lock();
            let st = &mut *guard;
            if !st.connection.is_active() {
                if st.connection == ConnectionState::Disconnecting && !reconnect {
                    st.reconnect_after_teardown = false;
                }
                tracing::trace!(state = st.connection.as_str(), "disconnect ignored");
                return;
            }

            st.reconnect_after_teardown = reconnect;
            st.first_packet = false;
            st.set_connection(ConnectionState::Disconnecting);
            match st.attempt.as_mut() {
                Some(attempt) => {
                    if let Some(stop) = attempt.shutdown.take() {
                        let _ = stop.send(());
                    }
                    (attempt.generation, st.options.teardown_timeout)
                }
                None => {
                    st.set_connection(ConnectionState::Disconnected);
                    drop(guard);
                    self.deliver();
                    return;
                }
            }
        };

        tracing::info!(generation, "disconnecting");
        self.deliver();

        // The attempt task bounds its own teardown; this covers a task stuck
        // somewhere it cannot observe the shutdown signal.
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(teardown + WATCHDOG_GRACE).await;
            inner.finish(generation, Outcome::Closed { clean: false });
        });
    }

    /// CONNECTING -> CONNECTED for the live attempt.
    pub(crate) fn mark_connected(&self, generation: u64) -> bool {
        let ok = {
            let mut st = self.lock();
            let ok = st.owns(generation) && st.connection == ConnectionState::Connecting;
            if ok {
                st.set_connection(ConnectionState::Connected);
            }
            ok
        };
        self.deliver();
        ok
    }

    /// Record a successful authorization and arm the first packet.
    pub(crate) fn mark_authorized(&self, generation: u64) -> bool {
        let ok = {
            let mut st = self.lock();
            let ok = st.owns(generation) && st.connection == ConnectionState::Connected;
            if ok {
                st.first_packet = true;
                st.set_auth(AuthState::Authorized);
            }
            ok
        };
        self.deliver();
        ok
    }

    /// The collector ended the session: report why, then DISCONNECTING.
    pub(crate) fn begin_teardown(&self, generation: u64, cause: AuthState) -> bool {
        let ok = {
            let mut st = self.lock();
            let ok = st.owns(generation) && st.connection == ConnectionState::Connected;
            if ok {
                st.first_packet = false;
                st.set_auth(cause);
                st.set_connection(ConnectionState::Disconnecting);
            }
            ok
        };
        self.deliver();
        ok
    }

    /// Final transition of an attempt. Ignored for stale generations.
    pub(crate) fn finish(self: &Arc<Self>, generation: u64, outcome: Outcome) {
        let reconnect = {
            let mut st = self.lock();
            if !st.owns(generation) {
                tracing::trace!(generation, "stale attempt result ignored");
                return;
            }

            match outcome {
                // A clean close keeps any failure cause already reported.
                Outcome::Closed { clean: true } => {
                    if st.auth == AuthState::Authorized {
                        st.set_auth(AuthState::None);
                    }
                }
                Outcome::Closed { clean: false } => st.set_auth(AuthState::LostConnection),
                Outcome::Failed(e) => st.set_auth(e.auth_state()),
            }
            st.attempt = None;
            st.first_packet = false;
            st.set_connection(ConnectionState::Disconnected);
            std::mem::take(&mut st.reconnect_after_teardown)
        };

        self.deliver();
        if reconnect {
            self.connect();
        }
    }
}
