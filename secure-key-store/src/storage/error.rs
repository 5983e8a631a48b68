//! Error types for the storage components.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the key manager, AEAD engine, record adapter and platform
/// implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Errors coming from the key service.
    #[error("key service error: {0}")]
    KeyService(String),

    /// Errors coming from the preference store.
    #[error("preference store error: {0}")]
    Preferences(String),

    /// The master key is missing or could not be provisioned.
    #[error("master key unavailable: {0}")]
    KeyUnavailable(String),

    /// Cryptographic failures (authentication, malformed cipher input).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Base64 or UTF-8 conversion failures.
    #[error("codec error: {0}")]
    Codec(String),

    /// A stored record is missing fields or has invalid lengths.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Serialization/deserialization failures.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failures from the file-backed platform.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
