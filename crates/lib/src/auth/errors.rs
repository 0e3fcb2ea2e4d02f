//! Error types for access-token claim decoding.

use thiserror::Error as ThisError;

/// Why an expiry could not be read from an access token.
///
/// Every variant means "expiry unknown"; callers treat the token as due for
/// refresh. The variants stay distinct so logs can tell an opaque token apart
/// from a well-formed JWT that simply carries no `exp` claim.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ClaimsError {
    /// The token does not have the three dot-separated JWT segments.
    #[error("token is not a JWT ({segments} segments)")]
    NotAJwt { segments: usize },

    /// The payload segment is not valid base64url.
    #[error("token payload is not base64url: {reason}")]
    InvalidEncoding { reason: String },

    /// The payload decoded but is not a JSON object.
    #[error("token payload is not a JSON object: {reason}")]
    InvalidPayload { reason: String },

    /// The payload is a JSON object without a usable numeric `exp` claim.
    #[error("token has no usable exp claim")]
    MissingExpiry,
}

impl ClaimsError {
    /// The token could not be decoded at all.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            ClaimsError::NotAJwt { .. }
                | ClaimsError::InvalidEncoding { .. }
                | ClaimsError::InvalidPayload { .. }
        )
    }

    /// Short label for structured logging.
    pub fn kind(&self) -> &'static str {
        if self.is_opaque() { "opaque" } else { "no_exp" }
    }
}

impl From<ClaimsError> for crate::Error {
    fn from(err: ClaimsError) -> Self {
        crate::Error::Claims(err)
    }
}
