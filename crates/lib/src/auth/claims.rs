//! Access-token claim decoding.
//!
//! Only the expiry is read. The signature is never checked: the server is the
//! authority, the client just wants to know when to refresh.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::Value;
use tracing::warn;

use super::errors::ClaimsError;

/// Decode the `exp` claim of a JWT into epoch milliseconds.
pub fn decode_expiry(token: &str) -> Result<u64, ClaimsError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::NotAJwt {
            segments: segments.len(),
        });
    }

    // Some issuers pad the segments; base64url in JWTs is unpadded.
    let payload = segments[1].trim_end_matches('=');
    let bytes =
        Base64UrlUnpadded::decode_vec(payload).map_err(|e| ClaimsError::InvalidEncoding {
            reason: e.to_string(),
        })?;

    let claims: Value =
        serde_json::from_slice(&bytes).map_err(|e| ClaimsError::InvalidPayload {
            reason: e.to_string(),
        })?;
    let Value::Object(claims) = claims else {
        return Err(ClaimsError::InvalidPayload {
            reason: "not an object".to_string(),
        });
    };

    let exp = claims.get("exp").ok_or(ClaimsError::MissingExpiry)?;
    let seconds = match exp {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        _ => None,
    }
    .ok_or(ClaimsError::MissingExpiry)?;

    Ok(seconds.saturating_mul(1000))
}

/// Decode the expiry, logging why it is unknown when decoding fails.
pub fn expiry_or_unknown(token: &str) -> Option<u64> {
    match decode_expiry(token) {
        Ok(expiry) => Some(expiry),
        Err(err) => {
            warn!(kind = err.kind(), error = %err, "access token expiry unknown, will refresh proactively");
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    format!("{header}.{body}.signature")
}
