//! Persistent preference store trait.

use serde::{Deserialize, Serialize};

use crate::storage::StorageResult;

/// A value held by the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    /// A boolean flag.
    Bool(bool),
    /// A text value.
    Text(String),
}

impl PreferenceValue {
    /// Returns the boolean, if this is a flag.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Bool(_) => None,
        }
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Persistent string-keyed mapping.
///
/// Mutations may be staged in memory; they are only guaranteed durable once
/// [`PreferenceStore::flush`] returns. A failed flush discards every mutation
/// staged since the last successful one.
pub trait PreferenceStore: Send + Sync {
    /// Reads the value under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &str) -> StorageResult<Option<PreferenceValue>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &str, value: PreferenceValue) -> StorageResult<()>;

    /// Returns whether a value exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn has(&self, key: &str) -> StorageResult<bool>;

    /// Deletes the value under `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear fails.
    fn clear(&self) -> StorageResult<()>;

    /// Makes all staged mutations durable.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. Staged mutations are rolled back
    /// to the last durable state in that case.
    fn flush(&self) -> StorageResult<()>;
}
