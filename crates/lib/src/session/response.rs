//! Normalization of login and registration responses.
//!
//! The backend answers either `{access, refresh, user?}` or
//! `{tokens: {access, refresh}, user}`. Registration may also answer with the
//! created account alone, which carries no tokens.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::{TokenPair, UserProfile};

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthResponse {
    Nested {
        tokens: TokenPair,
        #[serde(default)]
        user: Option<Value>,
    },
    Flat {
        access: String,
        refresh: String,
        #[serde(default)]
        user: Option<Value>,
    },
}

/// Tokens and profile carried by an authentication response.
#[derive(Debug)]
pub struct AuthGrant {
    pub tokens: TokenPair,
    pub user: Option<UserProfile>,
}

/// Extract a grant, or `None` when the body holds no complete token pair.
///
/// An unreadable `user` object is dropped rather than failing the grant; the
/// profile is fetched separately in that case.
pub fn parse_auth_response(body: Value) -> Option<AuthGrant> {
    let (tokens, user) = match serde_json::from_value::<AuthResponse>(body).ok()? {
        AuthResponse::Nested { tokens, user } => (tokens, user),
        AuthResponse::Flat {
            access,
            refresh,
            user,
        } => (TokenPair::new(access, refresh), user),
    };
    if !tokens.is_complete() {
        return None;
    }

    let user = user
        .filter(|u| !u.is_null())
        .and_then(|u| match serde_json::from_value::<UserProfile>(u) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable user in auth response");
                None
            }
        });
    Some(AuthGrant { tokens, user })
}
