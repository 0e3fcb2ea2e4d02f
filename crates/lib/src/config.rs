//! Client configuration.
//!
//! [`ClientConfig`] carries the API base URL and the timing knobs shared by the
//! HTTP client and the session controller. Build one with
//! [`ClientConfig::builder`].
//!
//! ```
//! use std::time::Duration;
//! use mycloud::ClientConfig;
//!
//! # fn main() -> mycloud::Result<()> {
//! let config = ClientConfig::builder("https://cloud.example.com/api/")
//!     .refresh_buffer(Duration::from_secs(60))
//!     .build()?;
//! assert_eq!(config.base_url(), "https://cloud.example.com/api");
//! assert_eq!(
//!     config.endpoint("files/")?.as_str(),
//!     "https://cloud.example.com/api/files/"
//! );
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::{
    Result,
    constants::{DEFAULT_REFRESH_BUFFER, DEFAULT_REQUEST_TIMEOUT, UPLOAD_CHUNK_SIZE, UPLOAD_TIMEOUT},
};

/// Errors raised while building or applying a [`ClientConfig`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A request path did not form a valid URL when joined to the base.
    #[error("Invalid request path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A numeric setting was out of range.
    #[error("Invalid value for {setting}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Settings shared by every component of a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    refresh_buffer: Duration,
    request_timeout: Duration,
    upload_timeout: Duration,
    upload_chunk_size: usize,
    user_agent: String,
}

impl ClientConfig {
    /// Start building a configuration for the API rooted at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Configuration with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// How long before expiry a token is considered due for refresh.
    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    pub fn upload_chunk_size(&self) -> usize {
        self.upload_chunk_size
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Join `path` onto the base URL.
    ///
    /// The path gets exactly one leading slash whatever the caller passed, so
    /// `"files/"`, `"/files/"` and `"//files/"` all resolve to `<base>/files/`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let trimmed = path.trim_start_matches('/');
        let joined = format!("{}/{}", self.base_url, trimmed);
        Url::parse(&joined).map_err(|e| {
            ConfigError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    refresh_buffer: Duration,
    request_timeout: Duration,
    upload_timeout: Duration,
    upload_chunk_size: usize,
    user_agent: String,
}

impl ClientConfigBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
            upload_chunk_size: UPLOAD_CHUNK_SIZE,
            user_agent: format!("mycloud/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Refresh the access token this long before it expires.
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Timeout applied to every request except uploads.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Timeout applied to uploads.
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Slice size used when streaming upload bodies.
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = size;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Validate the settings and produce a [`ClientConfig`].
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }
            .into());
        }
        if self.upload_chunk_size == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "upload_chunk_size",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.request_timeout.is_zero() || self.upload_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                setting: "timeout",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(ClientConfig {
            base_url,
            refresh_buffer: self.refresh_buffer,
            request_timeout: self.request_timeout,
            upload_timeout: self.upload_timeout,
            upload_chunk_size: self.upload_chunk_size,
            user_agent: self.user_agent,
        })
    }
}
