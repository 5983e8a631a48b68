//! Master key provisioning.
//!
//! Exactly one AES-256-GCM master key exists per installation, held by the
//! [`KeyService`] under a fixed alias. This manager never sees key material.

use std::sync::Arc;

use super::error::{StorageError, StorageResult};
use crate::platform::{CipherRequest, KeyService, KeySpec};

/// Ensures the master key exists and routes cipher operations to it.
pub struct MasterKeyManager {
    key_service: Arc<dyn KeyService>,
    alias: String,
}

impl MasterKeyManager {
    /// Creates a manager for the key under `alias`.
    #[must_use]
    pub fn new(key_service: Arc<dyn KeyService>, alias: impl Into<String>) -> Self {
        Self {
            key_service,
            alias: alias.into(),
        }
    }

    /// Alias of the master key.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns whether the master key exists. A failed lookup counts as absent.
    #[must_use]
    pub fn key_exists(&self) -> bool {
        match self.key_service.key_exists(&self.alias) {
            Ok(exists) => exists,
            Err(err) => {
                log::warn!("master key lookup failed, treating as absent: {err}");
                false
            }
        }
    }

    /// Generates the master key if it does not exist. A no-op when it does.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::KeyUnavailable`] if generation fails.
    pub fn ensure_key_exists(&self) -> StorageResult<()> {
        if self.key_exists() {
            return Ok(());
        }
        self.key_service
            .generate_key(&self.alias, &KeySpec::aes_256_gcm())
            .map_err(|err| {
                log::error!("failed to generate master key: {err}");
                StorageError::KeyUnavailable(err.to_string())
            })?;
        log::info!("master key generated");
        Ok(())
    }

    /// Deletes the master key. Failures are logged and otherwise ignored.
    pub fn delete_key(&self) {
        if let Err(err) = self.key_service.delete_key(&self.alias) {
            log::warn!("failed to delete master key: {err}");
        }
    }

    /// Runs a cipher operation with the master key.
    pub(crate) fn operate(&self, request: &CipherRequest<'_>) -> StorageResult<Vec<u8>> {
        self.key_service.cipher_operate(&self.alias, request)
    }
}
