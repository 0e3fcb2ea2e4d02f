//! Error types for session operations.

use thiserror::Error;

/// Errors raised by the session controller itself.
///
/// Failures of the underlying requests surface as [`crate::http::HttpError`];
/// these cover what the controller decides on its own.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// A login or registration is already running.
    #[error("Authentication already in progress")]
    AuthenticationInProgress,

    /// The server answered with a shape that carries no usable tokens.
    #[error("Malformed authentication response: {reason}")]
    MalformedAuthResponse { reason: String },

    /// An operation that needs a session was called without one.
    #[error("Not logged in")]
    NotLoggedIn,
}

impl SessionError {
    /// Check if this error means the caller has to log in first.
    pub fn requires_login(&self) -> bool {
        matches!(self, SessionError::NotLoggedIn)
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
