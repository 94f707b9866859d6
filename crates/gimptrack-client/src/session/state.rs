//! Session state guarded by the manager's mutex.

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};

use gimptrack_core::{AuthState, ConnectionState};

use crate::session::listener::Notification;
use crate::session::SessionOptions;

/// Handles to one connection attempt's task.
pub(crate) struct Attempt {
    pub generation: u64,
    pub outbound: mpsc::UnboundedSender<String>,
    pub shutdown: Option<oneshot::Sender<()>>,
}

pub(crate) struct State {
    pub connection: ConnectionState,
    pub auth: AuthState,
    /// Bumped by every `connect`; results from older attempts are stale.
    pub generation: u64,
    pub first_packet: bool,
    pub options: SessionOptions,
    pub attempt: Option<Attempt>,
    pub reconnect_after_teardown: bool,
    /// Transitions not yet handed to listeners, in order.
    pub events: VecDeque<Notification>,
    pub delivering: bool,
}

impl State {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            auth: AuthState::None,
            generation: 0,
            first_packet: false,
            options,
            attempt: None,
            reconnect_after_teardown: false,
            events: VecDeque::new(),
            delivering: false,
        }
    }

    /// Apply a connection transition and queue its notification.
    pub fn set_connection(&mut self, next: ConnectionState) {
        if self.connection == next {
            return;
        }
        tracing::debug!(
            generation = self.generation,
            from = self.connection.as_str(),
            to = next.as_str(),
            "connection state"
        );
        self.connection = next;
        self.events.push_back(Notification::Status(next));
    }

    /// Apply an auth transition and queue its notification.
    pub fn set_auth(&mut self, next: AuthState) {
        if self.auth == next {
            return;
        }
        tracing::debug!(
            generation = self.generation,
            from = self.auth.as_str(),
            to = next.as_str(),
            "auth state"
        );
        self.auth = next;
        self.events.push_back(Notification::Error(next));
    }

    /// True while `generation` is the live attempt.
    pub fn owns(&self, generation: u64) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }
}
