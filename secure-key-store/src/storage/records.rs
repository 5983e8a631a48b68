//! Record store adapter over the preference store.
//!
//! Caller keys are namespaced under [`RECORD_KEY_PREFIX`] so they can never
//! collide with [`INSTALLED_FLAG_KEY`]. Every mutation is flushed before the
//! call returns.

use std::sync::Arc;

use super::error::{StorageError, StorageResult};
use super::{INSTALLED_FLAG_KEY, RECORD_KEY_PREFIX};
use crate::platform::{PreferenceStore, PreferenceValue};

/// Maps caller keys to serialized [`EncryptedRecord`](super::EncryptedRecord)s.
pub struct RecordStore {
    preferences: Arc<dyn PreferenceStore>,
}

fn record_key(key: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{key}")
}

impl RecordStore {
    /// Creates an adapter over `preferences`.
    #[must_use]
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self { preferences }
    }

    /// Reads the serialized record for `key`. `None` when absent or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the entry is not text.
    pub fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.preferences.get(&record_key(key))? {
            None => Ok(None),
            Some(PreferenceValue::Text(text)) if text.is_empty() => Ok(None),
            Some(PreferenceValue::Text(text)) => Ok(Some(text)),
            Some(PreferenceValue::Bool(_)) => Err(StorageError::InvalidRecord(
                "stored entry is not a record".to_string(),
            )),
        }
    }

    /// Writes the serialized record for `key` and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or flush fails.
    pub fn put(&self, key: &str, record: String) -> StorageResult<()> {
        self.preferences
            .put(&record_key(key), PreferenceValue::Text(record))?;
        self.preferences.flush()
    }

    /// Deletes the record for `key` and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete or flush fails.
    pub fn delete(&self, key: &str) -> StorageResult<()> {
        self.preferences.delete(&record_key(key))?;
        self.preferences.flush()
    }

    /// Returns whether a record exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn has(&self, key: &str) -> StorageResult<bool> {
        self.preferences.has(&record_key(key))
    }

    /// Removes every record and the installed flag, then flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear or flush fails.
    pub fn clear(&self) -> StorageResult<()> {
        self.preferences.clear()?;
        self.preferences.flush()
    }

    /// Forces staged writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> StorageResult<()> {
        self.preferences.flush()
    }

    /// Reads the installed flag. Absent or non-boolean counts as not installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn is_installed(&self) -> StorageResult<bool> {
        Ok(self
            .preferences
            .get(INSTALLED_FLAG_KEY)?
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    /// Sets the installed flag and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or flush fails.
    pub fn mark_installed(&self) -> StorageResult<()> {
        self.preferences
            .put(INSTALLED_FLAG_KEY, PreferenceValue::Bool(true))?;
        self.flush()
    }
}
