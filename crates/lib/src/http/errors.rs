//! Error types for HTTP requests.

use thiserror::Error;

/// Errors raised while talking to the REST backend.
///
/// The type is `Clone` so the outcome of one token refresh can be handed to
/// every request that was waiting on it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The server rejected the request.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request could not be delivered or the connection broke.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// The request did not complete in time.
    #[error("Request timed out: {reason}")]
    Timeout { reason: String },

    /// Authorization failed and could not be renewed; the session is gone.
    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },

    /// An authorized call was attempted with no stored credentials.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A response body did not have the expected shape.
    #[error("Unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Renewed credentials could not be persisted.
    #[error("Could not persist tokens: {reason}")]
    Storage { reason: String },
}

impl HttpError {
    /// Check if this error is a transport failure or timeout.
    pub fn is_network_error(&self) -> bool {
        matches!(self, HttpError::Network { .. } | HttpError::Timeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// Check if this error ended the session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, HttpError::SessionExpired { .. })
    }

    /// Check if the caller has to (re)authenticate before trying again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            HttpError::SessionExpired { .. } | HttpError::NotAuthenticated
        )
    }

    /// HTTP status of a server rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout {
                reason: err.to_string(),
            }
        } else {
            HttpError::Network {
                reason: err.to_string(),
            }
        }
    }
}

impl From<HttpError> for crate::Error {
    fn from(err: HttpError) -> Self {
        crate::Error::Http(err)
    }
}
