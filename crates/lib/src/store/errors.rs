//! Error types for token store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`super::TokenStore`] implementations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A token pair with an empty access or refresh token was offered for saving.
    #[error("Refusing to store an incomplete token pair")]
    IncompleteTokens,

    /// A value could not be serialized for storage.
    #[error("Serialization failed for key '{key}': {reason}")]
    SerializationFailed { key: String, reason: String },

    /// Reading or writing the backing file failed.
    #[error("I/O error on token store '{path}': {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON key/value map.
    #[error("Token store '{path}' is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl StoreError {
    /// Check if this error came from the filesystem.
    pub fn is_io_error(&self) -> bool {
        matches!(self, StoreError::FileIo { .. })
    }

    /// Check if this error is related to the shape of stored data.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            StoreError::IncompleteTokens
                | StoreError::SerializationFailed { .. }
                | StoreError::Corrupt { .. }
        )
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
