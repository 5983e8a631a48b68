//! In-memory implementations of platform traits for testing.
//!
//! The key service performs real AES-256-GCM but holds key material in process
//! memory, so nothing here is suitable for production use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::software::SoftwareKey;
use super::{CipherRequest, KeyService, KeySpec, PreferenceStore, PreferenceValue};
use crate::storage::{StorageError, StorageResult};

// =============================================================================
// Memory Key Service
// =============================================================================

/// In-memory key service backed by software AES-256-GCM.
///
/// Supports failure injection so tests can exercise key-generation failures.
pub struct MemoryKeyService {
    keys: RwLock<HashMap<String, SoftwareKey>>,
    fail_generation: AtomicBool,
    generated: AtomicU64,
}

impl MemoryKeyService {
    /// Creates an empty key service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            fail_generation: AtomicBool::new(false),
            generated: AtomicU64::new(0),
        }
    }

    /// Makes subsequent `generate_key` calls fail while `fail` is set.
    pub fn set_fail_generation(&self, fail: bool) {
        self.fail_generation.store(fail, Ordering::SeqCst);
    }

    /// Returns how many keys have been generated so far.
    #[must_use]
    pub fn generated_count(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }
}

impl Default for MemoryKeyService {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StorageError {
    StorageError::KeyService("lock poisoned".to_string())
}

impl KeyService for MemoryKeyService {
    fn key_exists(&self, alias: &str) -> StorageResult<bool> {
        Ok(self.keys.read().map_err(|_| poisoned())?.contains_key(alias))
    }

    fn generate_key(&self, alias: &str, spec: &KeySpec) -> StorageResult<()> {
        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(StorageError::KeyService(
                "key generation refused".to_string(),
            ));
        }
        let key = SoftwareKey::generate(spec)?;
        self.keys
            .write()
            .map_err(|_| poisoned())?
            .insert(alias.to_string(), key);
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_key(&self, alias: &str) -> StorageResult<()> {
        self.keys.write().map_err(|_| poisoned())?.remove(alias);
        Ok(())
    }

    fn cipher_operate(&self, alias: &str, request: &CipherRequest<'_>) -> StorageResult<Vec<u8>> {
        let keys = self.keys.read().map_err(|_| poisoned())?;
        let key = keys
            .get(alias)
            .ok_or_else(|| StorageError::KeyUnavailable(format!("no key under alias {alias}")))?;
        key.operate(request)
    }
}

// =============================================================================
// Memory Preferences
// =============================================================================

/// In-memory preference store that tracks which state has been flushed.
///
/// Staged writes live in `entries`; [`PreferenceStore::flush`] copies them to
/// the durable view returned by [`MemoryPreferences::durable_snapshot`].
pub struct MemoryPreferences {
    entries: RwLock<HashMap<String, PreferenceValue>>,
    durable: RwLock<HashMap<String, PreferenceValue>>,
    flush_count: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryPreferences {
    /// Creates an empty preference store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            durable: RwLock::new(HashMap::new()),
            flush_count: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every mutating call (including `flush`) fail while `fail` is set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of completed flushes.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::SeqCst)
    }

    /// Returns a copy of the flushed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn durable_snapshot(&self) -> StorageResult<HashMap<String, PreferenceValue>> {
        Ok(self.durable.read().map_err(|_| prefs_poisoned())?.clone())
    }

    /// Simulates a process restart: a new store holding only the flushed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn reopen(&self) -> StorageResult<Self> {
        let durable = self.durable_snapshot()?;
        Ok(Self {
            entries: RwLock::new(durable.clone()),
            durable: RwLock::new(durable),
            flush_count: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Returns the number of staged entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.entries.read().map_err(|_| prefs_poisoned())?.len())
    }

    /// Returns `true` if no entries are staged.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Preferences("write refused".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

fn prefs_poisoned() -> StorageError {
    StorageError::Preferences("lock poisoned".to_string())
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> StorageResult<Option<PreferenceValue>> {
        Ok(self
            .entries
            .read()
            .map_err(|_| prefs_poisoned())?
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: PreferenceValue) -> StorageResult<()> {
        self.check_writable()?;
        self.entries
            .write()
            .map_err(|_| prefs_poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self
            .entries
            .read()
            .map_err(|_| prefs_poisoned())?
            .contains_key(key))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.entries.write().map_err(|_| prefs_poisoned())?.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.check_writable()?;
        self.entries.write().map_err(|_| prefs_poisoned())?.clear();
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        if let Err(err) = self.check_writable() {
            let durable = self.durable.read().map_err(|_| prefs_poisoned())?.clone();
            *self.entries.write().map_err(|_| prefs_poisoned())? = durable;
            return Err(err);
        }
        let entries = self.entries.read().map_err(|_| prefs_poisoned())?.clone();
        *self.durable.write().map_err(|_| prefs_poisoned())? = entries;
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Memory Platform Bundle
// =============================================================================

/// Combines the in-memory implementations for easy test setup.
///
/// # Example
///
/// ```
/// use secure_key_store::platform::MemoryPlatform;
/// use secure_key_store::{SecureKeyStore, StoreConfig};
///
/// let platform = MemoryPlatform::new();
/// let store = SecureKeyStore::new(
///     StoreConfig::default(),
///     platform.key_service.clone(),
///     platform.preferences.clone(),
/// );
/// store.initialize();
/// store.set("token", "s3cret").expect("set");
/// assert_eq!(store.get("token").expect("get"), "s3cret");
/// ```
pub struct MemoryPlatform {
    /// In-memory key service.
    pub key_service: Arc<MemoryKeyService>,
    /// In-memory preference store.
    pub preferences: Arc<MemoryPreferences>,
}

impl MemoryPlatform {
    /// Creates a new memory platform with empty components.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_service: Arc::new(MemoryKeyService::new()),
            preferences: Arc::new(MemoryPreferences::new()),
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::GCM_TAG_SIZE;

    #[test]
    fn test_memory_key_service_lifecycle() {
        let service = MemoryKeyService::new();
        assert!(!service.key_exists("main").expect("exists"));

        service
            .generate_key("main", &KeySpec::aes_256_gcm())
            .expect("generate");
        assert!(service.key_exists("main").expect("exists"));
        assert_eq!(service.generated_count(), 1);

        service.delete_key("main").expect("delete");
        assert!(!service.key_exists("main").expect("exists"));
        service.delete_key("main").expect("delete absent");
    }

    #[test]
    fn test_memory_key_service_missing_key() {
        let service = MemoryKeyService::new();
        let result = service.cipher_operate("main", &CipherRequest::encrypt(&[0u8; 12], b"x"));
        assert!(matches!(result, Err(StorageError::KeyUnavailable(_))));
    }

    #[test]
    fn test_memory_key_service_regenerated_key_differs() {
        let service = MemoryKeyService::new();
        let nonce = [3u8; 12];
        service
            .generate_key("main", &KeySpec::aes_256_gcm())
            .expect("generate");
        let sealed = service
            .cipher_operate("main", &CipherRequest::encrypt(&nonce, b"value"))
            .expect("encrypt");

        service
            .generate_key("main", &KeySpec::aes_256_gcm())
            .expect("regenerate");
        let (ciphertext, tag) = sealed.split_at(sealed.len() - GCM_TAG_SIZE);
        let result =
            service.cipher_operate("main", &CipherRequest::decrypt(&nonce, tag, ciphertext));
        assert!(matches!(result, Err(StorageError::Crypto(_))));
    }

    #[test]
    fn test_memory_key_service_generation_failure() {
        let service = MemoryKeyService::new();
        service.set_fail_generation(true);
        assert!(service
            .generate_key("main", &KeySpec::aes_256_gcm())
            .is_err());
        assert!(!service.key_exists("main").expect("exists"));
        assert_eq!(service.generated_count(), 0);
    }

    #[test]
    fn test_memory_preferences_flush_tracks_durable_state() {
        let prefs = MemoryPreferences::new();
        prefs.put("a", PreferenceValue::Bool(true)).expect("put");
        assert!(prefs.durable_snapshot().expect("snapshot").is_empty());

        prefs.flush().expect("flush");
        assert_eq!(prefs.flush_count(), 1);
        assert_eq!(
            prefs.durable_snapshot().expect("snapshot").get("a"),
            Some(&PreferenceValue::Bool(true))
        );

        prefs.put("b", PreferenceValue::Text("x".into())).expect("put");
        let reopened = prefs.reopen().expect("reopen");
        assert!(reopened.has("a").expect("has"));
        assert!(!reopened.has("b").expect("has"));
    }

    #[test]
    fn test_memory_preferences_basic() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.is_empty().expect("empty"));
        assert!(prefs.get("k").expect("get").is_none());

        prefs.put("k", PreferenceValue::Text("v1".into())).expect("put");
        prefs.put("k", PreferenceValue::Text("v2".into())).expect("put");
        assert_eq!(
            prefs.get("k").expect("get"),
            Some(PreferenceValue::Text("v2".into()))
        );

        prefs.delete("k").expect("delete");
        assert!(!prefs.has("k").expect("has"));

        prefs.put("x", PreferenceValue::Bool(false)).expect("put");
        prefs.put("y", PreferenceValue::Bool(true)).expect("put");
        assert_eq!(prefs.len().expect("len"), 2);
        prefs.clear().expect("clear");
        assert!(prefs.is_empty().expect("empty"));
    }

    #[test]
    fn test_memory_preferences_failed_flush_rolls_back() {
        let prefs = MemoryPreferences::new();
        prefs.put("kept", PreferenceValue::Bool(true)).expect("put");
        prefs.flush().expect("flush");
        prefs.put("staged", PreferenceValue::Bool(true)).expect("put");

        prefs.set_fail_writes(true);
        assert!(prefs.flush().is_err());
        prefs.set_fail_writes(false);

        assert!(prefs.has("kept").expect("has"));
        assert!(!prefs.has("staged").expect("has"));
    }

    #[test]
    fn test_memory_preferences_fail_writes() {
        let prefs = MemoryPreferences::new();
        prefs.set_fail_writes(true);
        assert!(prefs.put("k", PreferenceValue::Bool(true)).is_err());
        assert!(prefs.flush().is_err());
        assert!(prefs.get("k").expect("reads still work").is_none());
    }
}
