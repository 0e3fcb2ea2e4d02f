//! Token persistence
//!
//! A [`TokenStore`] is a small durable key/value map holding two entries: the
//! serialized [`TokenPair`] under [`TOKENS_KEY`] and the cached
//! [`UserProfile`] under [`USER_KEY`]. Implementations provide the raw
//! `get`/`set`/`remove` primitives; the typed accessors are shared.
//!
//! One store is constructed per process and handed to both the HTTP client
//! and the session controller as an `Arc<dyn TokenStore>`.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    Result,
    constants::{TOKENS_KEY, USER_KEY},
    models::{TokenPair, UserProfile},
};

pub mod errors;
pub mod file;
pub mod memory;

pub use errors::StoreError;
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

/// Durable key/value storage for session credentials.
pub trait TokenStore: Send + Sync + Debug {
    /// Raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// The stored token pair, if a complete one is present.
    ///
    /// A value that no longer parses is treated as absent.
    fn load(&self) -> Result<Option<TokenPair>> {
        Ok(read_json::<TokenPair>(self, TOKENS_KEY)?.filter(TokenPair::is_complete))
    }

    /// Persist `tokens`. Both halves must be non-empty.
    fn save(&self, tokens: &TokenPair) -> Result<()> {
        if !tokens.is_complete() {
            return Err(StoreError::IncompleteTokens.into());
        }
        write_json(self, TOKENS_KEY, tokens)
    }

    /// Remove the token pair and the cached profile.
    fn clear(&self) -> Result<()> {
        self.remove(TOKENS_KEY)?;
        self.remove(USER_KEY)
    }

    /// The cached user profile, if any.
    fn load_user(&self) -> Result<Option<UserProfile>> {
        read_json(self, USER_KEY)
    }

    fn save_user(&self, user: &UserProfile) -> Result<()> {
        write_json(self, USER_KEY, user)
    }
}

fn read_json<T: DeserializeOwned>(
    store: &(impl TokenStore + ?Sized),
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable token store entry");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize>(
    store: &(impl TokenStore + ?Sized),
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::SerializationFailed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, raw)
}
