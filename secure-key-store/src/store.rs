//! Lifecycle controller implementing the public operation surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Operation, SecureStoreError};
use crate::platform::{KeyService, PreferenceStore};
use crate::storage::{
    AeadEngine, EncryptedRecord, MasterKeyManager, RecordStore, StorageError, StorageResult,
};

/// Result of a successful `set`.
pub const KEY_STORED: &str = "key stored successfully";
/// Result of a successful `remove`.
pub const KEY_REMOVED: &str = "key removed successfully";
/// Result of a successful `reset`.
pub const STORE_RESET: &str = "store reset successfully";
/// Alias of the master key unless configured otherwise.
pub const DEFAULT_KEY_ALIAS: &str = "RNSecureKeyStoreMainKey";

/// Construction-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Alias of the master key in the key service.
    pub key_alias: String,
    /// Initial reset policy: wipe records and the master key when the
    /// installed flag is missing.
    pub reset_on_app_uninstall: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            reset_on_app_uninstall: true,
        }
    }
}

/// Options accepted by [`SecureKeyStore::set_with_options`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// iOS keychain accessibility class. Accepted for API parity; this
    /// backend has no equivalent and ignores it.
    pub accessible: Option<String>,
}

/// Initialization state of a [`SecureKeyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed; `initialize` has not run.
    Uninitialized,
    /// `initialize` is in progress.
    Initializing,
    /// Operations are accepted.
    Ready,
}

/// Encrypted key-value store.
///
/// Construction is two-phase: build the store with [`SecureKeyStore::new`],
/// then call [`SecureKeyStore::initialize`] before issuing operations.
/// Operations issued earlier fail with [`SecureStoreError::Uninitialized`].
///
/// Operations on one instance are expected to be issued sequentially.
pub struct SecureKeyStore {
    engine: AeadEngine,
    records: RecordStore,
    reset_on_app_uninstall: AtomicBool,
    state: Mutex<LifecycleState>,
}

impl std::fmt::Debug for SecureKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKeyStore")
            .field("key_alias", &self.engine.keys().alias())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SecureKeyStore {
    /// Creates an uninitialized store over the given platform capabilities.
    #[must_use]
    pub fn new(
        config: StoreConfig,
        key_service: Arc<dyn KeyService>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let keys = MasterKeyManager::new(key_service, config.key_alias);
        Self {
            engine: AeadEngine::new(keys),
            records: RecordStore::new(preferences),
            reset_on_app_uninstall: AtomicBool::new(config.reset_on_app_uninstall),
            state: Mutex::new(LifecycleState::Uninitialized),
        }
    }

    /// Runs reinstall detection and master key provisioning, then marks the
    /// store ready.
    ///
    /// Failures are logged and the store still becomes ready: later
    /// operations report them as operation errors. Calling this again once
    /// ready, or while another caller is initializing, is a no-op.
    pub fn initialize(&self) {
        {
            let mut state = self.lock_state();
            if *state != LifecycleState::Uninitialized {
                return;
            }
            *state = LifecycleState::Initializing;
        }

        log::debug!("initializing secure key store");
        self.check_reinstall();
        if let Err(err) = self.engine.keys().ensure_key_exists() {
            log::error!("secure key store initialized without a master key: {err}");
        }

        *self.lock_state() = LifecycleState::Ready;
        log::info!("secure key store ready");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    /// Encrypts `value` and stores it under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SecureStoreError::SaveFailed`] (code 9) wrapping any failure,
    /// or [`SecureStoreError::Uninitialized`] before [`SecureKeyStore::initialize`].
    pub fn set(&self, key: &str, value: &str) -> Result<&'static str, SecureStoreError> {
        self.ensure_ready(Operation::Set)?;
        self.store_value(key, value).map_err(|err| {
            log::error!("failed to store key: {err}");
            SecureStoreError::SaveFailed(format!("error saving key: {err}"))
        })?;
        Ok(KEY_STORED)
    }

    /// Same as [`SecureKeyStore::set`], accepting platform options.
    ///
    /// # Errors
    ///
    /// See [`SecureKeyStore::set`].
    pub fn set_with_options(
        &self,
        key: &str,
        value: &str,
        options: &SetOptions,
    ) -> Result<&'static str, SecureStoreError> {
        if let Some(accessible) = &options.accessible {
            log::debug!("ignoring unsupported accessibility option {accessible}");
        }
        self.set(key, value)
    }

    /// Decrypts and returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SecureStoreError::NotFound`] (code 404) if nothing is stored,
    /// [`SecureStoreError::RetrieveFailed`] (code 1) for any other failure,
    /// or [`SecureStoreError::Uninitialized`] before initialization.
    pub fn get(&self, key: &str) -> Result<String, SecureStoreError> {
        self.ensure_ready(Operation::Get)?;
        self.check_reinstall();

        let stored = self.records.get(key).map_err(retrieve_failed)?;
        let Some(stored) = stored else {
            return Err(SecureStoreError::NotFound);
        };
        EncryptedRecord::from_json(&stored)
            .and_then(|record| self.engine.decrypt(&record))
            .map_err(retrieve_failed)
    }

    /// Deletes the value stored under `key`.
    ///
    /// Does not run reinstall detection.
    ///
    /// # Errors
    ///
    /// Returns [`SecureStoreError::DeleteFailed`] (code 6) if the key is absent
    /// or the delete fails, or [`SecureStoreError::Uninitialized`] before
    /// initialization.
    pub fn remove(&self, key: &str) -> Result<&'static str, SecureStoreError> {
        self.ensure_ready(Operation::Remove)?;
        let exists = self.records.has(key).map_err(delete_failed)?;
        if !exists {
            return Err(SecureStoreError::DeleteFailed(
                "could not delete key".to_string(),
            ));
        }
        self.records.delete(key).map_err(delete_failed)?;
        Ok(KEY_REMOVED)
    }

    /// Returns whether a value is stored under `key`, without decrypting it.
    ///
    /// Runs reinstall detection first, like [`SecureKeyStore::get`].
    ///
    /// # Errors
    ///
    /// Returns [`SecureStoreError::RetrieveFailed`] if the lookup fails, or
    /// [`SecureStoreError::Uninitialized`] before initialization.
    pub fn contains(&self, key: &str) -> Result<bool, SecureStoreError> {
        self.ensure_ready(Operation::Get)?;
        self.check_reinstall();
        self.records.has(key).map_err(retrieve_failed)
    }

    /// Wipes every record and the master key, then provisions a new key.
    ///
    /// # Errors
    ///
    /// Returns [`SecureStoreError::SaveFailed`] if any step fails, or
    /// [`SecureStoreError::Uninitialized`] before initialization.
    pub fn reset(&self) -> Result<&'static str, SecureStoreError> {
        self.ensure_ready(Operation::Reset)?;
        self.wipe()
            .and_then(|()| self.records.mark_installed())
            .and_then(|()| self.engine.keys().ensure_key_exists())
            .map_err(|err| {
                log::error!("failed to reset secure key store: {err}");
                SecureStoreError::SaveFailed(format!("error resetting store: {err}"))
            })?;
        Ok(STORE_RESET)
    }

    /// Sets whether a missing installed flag wipes the store. Not persisted.
    pub fn set_reset_on_app_uninstall_to(&self, enabled: bool) {
        self.reset_on_app_uninstall.store(enabled, Ordering::SeqCst);
    }

    /// Current reset policy.
    #[must_use]
    pub fn reset_on_app_uninstall(&self) -> bool {
        self.reset_on_app_uninstall.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_ready(&self, operation: Operation) -> Result<(), SecureStoreError> {
        if self.state() == LifecycleState::Ready {
            Ok(())
        } else {
            Err(SecureStoreError::Uninitialized(operation))
        }
    }

    fn store_value(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_reinstall();
        self.engine.keys().ensure_key_exists()?;
        let record = self.engine.encrypt(value)?;
        self.records.put(key, record.to_json()?)
    }

    /// Reinstall detection. Errors are logged; the calling operation proceeds.
    fn check_reinstall(&self) {
        if let Err(err) = self.handle_app_uninstallation() {
            log::error!("reinstall detection failed: {err}");
        }
    }

    fn handle_app_uninstallation(&self) -> StorageResult<()> {
        let installed = self.records.is_installed()?;
        if !self.reset_on_app_uninstall() || installed {
            return Ok(());
        }
        log::info!("installed flag missing; wiping secure key store");
        self.wipe()?;
        self.records.mark_installed()
    }

    /// Clears records before deleting the key, so an interruption never
    /// leaves records sealed under a deleted key. Repeating it is harmless.
    fn wipe(&self) -> StorageResult<()> {
        self.records.clear()?;
        self.engine.keys().delete_key();
        Ok(())
    }
}

#[allow(clippy::needless_pass_by_value)]
fn retrieve_failed(err: StorageError) -> SecureStoreError {
    log::error!("failed to retrieve key: {err}");
    SecureStoreError::RetrieveFailed(format!("error retrieving key: {err}"))
}

#[allow(clippy::needless_pass_by_value)]
fn delete_failed(err: StorageError) -> SecureStoreError {
    log::error!("failed to delete key: {err}");
    SecureStoreError::DeleteFailed(format!("could not delete key: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::{MemoryPlatform, PreferenceValue};
    use crate::storage::INSTALLED_FLAG_KEY;

    fn store(platform: &MemoryPlatform) -> SecureKeyStore {
        SecureKeyStore::new(
            StoreConfig::default(),
            platform.key_service.clone(),
            platform.preferences.clone(),
        )
    }

    #[test]
    fn test_operations_before_initialize_fail() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        assert_eq!(store.state(), LifecycleState::Uninitialized);

        let err = store.set("a", "b").expect_err("set");
        assert_eq!(err.kind(), ErrorKind::Uninitialized);
        assert_eq!(err.code(), 9);
        assert_eq!(store.get("a").expect_err("get").code(), 1);
        assert_eq!(store.remove("a").expect_err("remove").code(), 6);
        assert_eq!(platform.key_service.generated_count(), 0);
    }

    #[test]
    fn test_initialize_provisions_key_and_flag() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        store.initialize();

        assert_eq!(store.state(), LifecycleState::Ready);
        assert_eq!(platform.key_service.generated_count(), 1);
        assert_eq!(
            platform
                .preferences
                .durable_snapshot()
                .expect("snapshot")
                .get(INSTALLED_FLAG_KEY),
            Some(&PreferenceValue::Bool(true))
        );

        store.initialize();
        assert_eq!(platform.key_service.generated_count(), 1);
    }

    #[test]
    fn test_initialize_with_failing_key_service_still_ready() {
        let platform = MemoryPlatform::new();
        platform.key_service.set_fail_generation(true);
        let store = store(&platform);
        store.initialize();
        assert_eq!(store.state(), LifecycleState::Ready);

        let err = store.set("a", "b").expect_err("set");
        assert_eq!(err.kind(), ErrorKind::SaveFailed);
        assert!(err.to_string().contains("master key unavailable"));

        platform.key_service.set_fail_generation(false);
        store.set("a", "b").expect("set after recovery");
        assert_eq!(store.get("a").expect("get"), "b");
    }

    #[test]
    fn test_set_with_options_ignores_accessibility() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        store.initialize();
        let options = SetOptions {
            accessible: Some("kSecAttrAccessibleAlways".to_string()),
        };
        assert_eq!(
            store.set_with_options("k", "v", &options).expect("set"),
            KEY_STORED
        );
        assert_eq!(store.get("k").expect("get"), "v");
    }

    #[test]
    fn test_reset_policy_toggle() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        assert!(store.reset_on_app_uninstall());
        store.set_reset_on_app_uninstall_to(false);
        assert!(!store.reset_on_app_uninstall());
    }

    #[test]
    fn test_policy_disabled_skips_wipe() {
        let platform = MemoryPlatform::new();
        let store = SecureKeyStore::new(
            StoreConfig {
                reset_on_app_uninstall: false,
                ..StoreConfig::default()
            },
            platform.key_service.clone(),
            platform.preferences.clone(),
        );
        store.initialize();
        store.set("a", "kept").expect("set");
        assert!(!platform.preferences.has(INSTALLED_FLAG_KEY).expect("has"));
        assert_eq!(store.get("a").expect("get"), "kept");
    }

    #[test]
    fn test_contains_agrees_with_get_after_reinstall() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        store.initialize();
        store.set("a", "1").expect("set");
        assert!(store.contains("a").expect("contains"));

        platform.preferences.delete(INSTALLED_FLAG_KEY).expect("delete");
        assert!(!store.contains("a").expect("contains"));
        assert_eq!(store.get("a").expect_err("wiped").code(), 404);
        assert!(platform.preferences.has(INSTALLED_FLAG_KEY).expect("has"));
    }

    #[test]
    fn test_reset_wipes_and_regenerates() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        store.initialize();
        store.set("a", "1").expect("set");

        assert_eq!(store.reset().expect("reset"), STORE_RESET);
        assert!(!store.contains("a").expect("contains"));
        assert_eq!(platform.key_service.generated_count(), 2);
        store.set("a", "2").expect("set");
        assert_eq!(store.get("a").expect("get"), "2");
    }

    #[test]
    fn test_save_failure_on_store_write() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        store.initialize();
        platform.preferences.set_fail_writes(true);
        let err = store.set("a", "b").expect_err("set");
        assert_eq!(err.code(), 9);
        assert!(err.payload().message.starts_with("error saving key"));
    }

    #[test]
    fn test_debug_omits_contents() {
        let platform = MemoryPlatform::new();
        let store = store(&platform);
        let debug = format!("{store:?}");
        assert!(debug.contains("RNSecureKeyStoreMainKey"));
        assert!(debug.contains("Uninitialized"));
    }
}
