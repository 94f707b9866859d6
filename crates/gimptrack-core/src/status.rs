//! Session status enums observed by listeners and hosts.

/// Socket lifecycle as seen by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnecting => "DISCONNECTING",
        }
    }

    /// True while a session is being set up or is live.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// Outcome of the most recent authorization attempt, or the cause of the
/// last disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthState {
    #[default]
    None,
    Authorized,
    Unauthorized,
    TimedOut,
    BadUrl,
    LostConnection,
}

impl AuthState {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthState::None => "NONE",
            AuthState::Authorized => "AUTHORIZED",
            AuthState::Unauthorized => "UNAUTHORIZED",
            AuthState::TimedOut => "TIMED_OUT",
            AuthState::BadUrl => "BAD_URL",
            AuthState::LostConnection => "LOST_CONNECTION",
        }
    }

    /// Short status line a host can show next to its connect control.
    pub fn label(self) -> &'static str {
        match self {
            AuthState::None => "",
            AuthState::Authorized => "Authorized",
            AuthState::Unauthorized => "Unauthorized",
            AuthState::TimedOut => "Timed out",
            AuthState::BadUrl => "Bad URL",
            AuthState::LostConnection => "Lost connection",
        }
    }

    pub fn is_error(self) -> bool {
        !matches!(self, AuthState::None | AuthState::Authorized)
    }
}
