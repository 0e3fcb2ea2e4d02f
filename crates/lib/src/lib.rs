//!
//! MyCloud client: session and asynchronous resource state for the MyCloud
//! file-storage REST API.
//!
//! ## Core Concepts
//!
//! * **Token store (`store::TokenStore`)**: Durable key/value storage for the access/refresh pair and the cached user profile. In-memory and JSON-file implementations are provided.
//! * **HTTP client (`http::HttpClient`)**: Attaches the bearer token, classifies responses, and on a 401 runs one shared token refresh before retrying exactly once.
//! * **Session controller (`session::SessionController`)**: The authentication state machine. Handles login, registration, the startup check, proactive refresh and logout, and publishes `session::SessionEvent`s.
//! * **Resource managers (`resource::ResourceManager`)**: Collections of files or users with per-id in-flight tracking, a loading flag, upload progress and the last error, so one slow operation never blocks another.
//! * **Client (`Client`)**: Wires the pieces together around one token store.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mycloud::{Client, ClientConfig, Credentials, store::MemoryTokenStore};
//!
//! # async fn run() -> mycloud::Result<()> {
//! let config = ClientConfig::new("https://cloud.example.com/api")?;
//! let client = Client::open(config, Arc::new(MemoryTokenStore::new()))?;
//!
//! client.session().login(&Credentials::new("demo", "Pw1!")).await?;
//! for file in client.files().list().await? {
//!     println!("{} ({} bytes)", file.original_name, file.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod constants;
pub mod http;
pub mod models;
pub mod resource;
pub mod session;
pub mod store;
pub mod validation;

pub use client::Client;
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use models::{Credentials, FileRecord, Registration, TokenPair, UserProfile, UserRecord};

/// Result type used throughout the MyCloud client.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the MyCloud client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),

    /// Structured transport errors from the http module
    #[error(transparent)]
    Http(http::HttpError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured persistence errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Client-side form checks from the validation module
    #[error(transparent)]
    Validation(validation::ValidationError),

    /// Token decoding errors from the auth module
    #[error(transparent)]
    Claims(auth::ClaimsError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Http(_) => "http",
            Error::Session(_) => "session",
            Error::Store(_) => "store",
            Error::Validation(_) => "validation",
            Error::Claims(_) => "auth",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error ended the session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Http(err) if err.is_session_expired())
    }

    /// Check if the caller has to log in before trying again.
    pub fn requires_login(&self) -> bool {
        match self {
            Error::Http(err) => err.requires_login(),
            Error::Session(err) => err.requires_login(),
            _ => false,
        }
    }

    /// Check if this error is a transport failure or timeout.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Http(err) if err.is_network_error())
    }

    /// Check if repeating the same call might succeed.
    ///
    /// Transport failures and server-side (5xx) errors are retryable; client
    /// errors, validation failures and an expired session are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(err) => {
                err.is_network_error() || err.status().is_some_and(|s| s >= 500 || s == 429)
            }
            _ => false,
        }
    }

    /// Check if this error came from a client-side check.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Http(err) if err.is_not_found())
    }

    /// HTTP status of a server rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(err) => err.status(),
            _ => None,
        }
    }
}
