use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Public operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `set`
    Set,
    /// `get`
    Get,
    /// `remove`
    Remove,
    /// `reset`
    Reset,
}

impl Operation {
    /// Generic failure code reported for this operation.
    #[must_use]
    pub const fn failure_code(self) -> i32 {
        match self {
            Self::Set | Self::Reset => SecureStoreError::SAVE_FAILED_CODE,
            Self::Get => SecureStoreError::RETRIEVE_FAILED_CODE,
            Self::Remove => SecureStoreError::DELETE_FAILED_CODE,
        }
    }
}

/// Category of a [`SecureStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested key has no stored value.
    NotFound,
    /// Storing a value failed.
    SaveFailed,
    /// Deleting a value failed or the key was absent.
    DeleteFailed,
    /// Retrieving a value failed: unreadable record, failed authentication or missing key.
    CryptoFailed,
    /// The store has not completed initialization.
    Uninitialized,
}

/// Error outputs from the secure key store.
#[derive(Debug, Error)]
pub enum SecureStoreError {
    /// `get` on a key with no stored value
    #[error("key does not present")]
    NotFound,
    /// Storing failed; wraps the underlying failure
    #[error("{0}")]
    SaveFailed(String),
    /// Retrieving failed; wraps the underlying failure
    #[error("{0}")]
    RetrieveFailed(String),
    /// Removing failed or the key was absent
    #[error("{0}")]
    DeleteFailed(String),
    /// The operation ran before `initialize` completed
    #[error("secure key store is not initialized")]
    Uninitialized(Operation),
}

impl SecureStoreError {
    /// Code for [`SecureStoreError::NotFound`].
    pub const NOT_FOUND_CODE: i32 = 404;
    /// Code for [`SecureStoreError::SaveFailed`].
    pub const SAVE_FAILED_CODE: i32 = 9;
    /// Code for [`SecureStoreError::RetrieveFailed`].
    pub const RETRIEVE_FAILED_CODE: i32 = 1;
    /// Code for [`SecureStoreError::DeleteFailed`].
    pub const DELETE_FAILED_CODE: i32 = 6;

    /// Structural category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::SaveFailed(_) => ErrorKind::SaveFailed,
            Self::RetrieveFailed(_) => ErrorKind::CryptoFailed,
            Self::DeleteFailed(_) => ErrorKind::DeleteFailed,
            Self::Uninitialized(_) => ErrorKind::Uninitialized,
        }
    }

    /// Integer code reported to callers.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::NotFound => Self::NOT_FOUND_CODE,
            Self::SaveFailed(_) => Self::SAVE_FAILED_CODE,
            Self::RetrieveFailed(_) => Self::RETRIEVE_FAILED_CODE,
            Self::DeleteFailed(_) => Self::DELETE_FAILED_CODE,
            Self::Uninitialized(operation) => operation.failure_code(),
        }
    }

    /// The `{code, message}` failure detail.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Failure detail carried across the operation boundary.
///
/// Displays as its JSON form, e.g. `{"code":404,"message":"key does not present"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Operation failure code.
    pub code: i32,
    /// Human-readable failure message.
    pub message: String,
}

impl ErrorPayload {
    /// Serializes the payload as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
