//! Shared error type across gimptrack crates.

use thiserror::Error;

use crate::status::AuthState;

/// Stable error codes (log fields and collector-facing `sys/error` frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed frame or payload.
    BadRequest,
    /// Collector rejected the credential.
    AuthFailed,
    /// Endpoint could not be parsed or has an unsupported scheme.
    BadUrl,
    /// Handshake or teardown exceeded its bound.
    Timeout,
    /// Network-level failure.
    Transport,
    /// Unsupported protocol version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON frames.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::BadUrl => "BAD_URL",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::Transport => "TRANSPORT",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("bad url: {0}")]
    BadUrl(String),
    #[error("timed out: {0}")]
    Timeout(&'static str),
    #[error("transport: {0}")]
    Transport(String),
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Map internal error to a stable code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TrackerError::BadRequest(_) => ClientCode::BadRequest,
            TrackerError::AuthFailed => ClientCode::AuthFailed,
            TrackerError::BadUrl(_) => ClientCode::BadUrl,
            TrackerError::Timeout(_) => ClientCode::Timeout,
            TrackerError::Transport(_) => ClientCode::Transport,
            TrackerError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            TrackerError::Internal(_) => ClientCode::Internal,
        }
    }

    /// The auth state a session reports when it ends because of this error.
    ///
    /// Anything that is not a credential, endpoint or timing problem counts as
    /// a lost connection.
    pub fn auth_state(&self) -> AuthState {
        match self {
            TrackerError::AuthFailed => AuthState::Unauthorized,
            TrackerError::BadUrl(_) => AuthState::BadUrl,
            TrackerError::Timeout(_) => AuthState::TimedOut,
            TrackerError::BadRequest(_)
            | TrackerError::Transport(_)
            | TrackerError::UnsupportedVersion
            | TrackerError::Internal(_) => AuthState::LostConnection,
        }
    }
}
