//! Connection observers.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use gimptrack_core::{AuthState, ConnectionState};

/// Observer of session transitions.
///
/// Callbacks run synchronously on whichever thread made the transition: the
/// caller of `connect`/`disconnect`, or a transport task. Implementations
/// needing thread affinity must hop themselves. Listeners may call back into
/// the session manager; transitions made from inside a callback are queued
/// and delivered after that callback returns.
///
/// Only one thread delivers at a time. If another thread is already
/// delivering when `connect`/`disconnect` makes a transition, the call
/// returns with the transition queued and that thread delivers it, still in
/// order and exactly once. Synchronous delivery on the calling thread holds
/// only when no other delivery is in progress.
pub trait ConnectionListener: Send + Sync {
    fn on_connection_status_changed(&self, _status: ConnectionState) {}
    fn on_connection_error_changed(&self, _error: AuthState) {}
}

/// One queued transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Status(ConnectionState),
    Error(AuthState),
}

impl Notification {
    pub(crate) fn deliver_to(self, listener: &dyn ConnectionListener) {
        match self {
            Notification::Status(s) => listener.on_connection_status_changed(s),
            Notification::Error(e) => listener.on_connection_error_changed(e),
        }
    }
}

/// Registered listeners, kept in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    list: RwLock<Vec<Arc<dyn ConnectionListener>>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<dyn ConnectionListener>) {
        self.list
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ConnectionListener>> {
        self.list
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Listener that forwards every notification into a channel, for async
/// hosts that want to `await` transitions.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelListener {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl ConnectionListener for ChannelListener {
    fn on_connection_status_changed(&self, status: ConnectionState) {
        let _ = self.tx.send(Notification::Status(status));
    }

    fn on_connection_error_changed(&self, error: AuthState) {
        let _ = self.tx.send(Notification::Error(error));
    }
}
