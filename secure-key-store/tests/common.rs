//! Common test utilities shared across integration tests.

use std::path::Path;
use std::sync::Arc;

use secure_key_store::platform::{
    FileKeyService, FilePreferences, MemoryPlatform, PreferenceStore, PreferenceValue,
};
use secure_key_store::storage::{EncryptedRecord, RECORD_KEY_PREFIX};
use secure_key_store::{SecureKeyStore, StoreConfig};

/// Builds an initialized store over `platform`.
#[allow(dead_code)]
pub fn memory_store(platform: &MemoryPlatform, config: StoreConfig) -> SecureKeyStore {
    let store = SecureKeyStore::new(
        config,
        platform.key_service.clone(),
        platform.preferences.clone(),
    );
    store.initialize();
    store
}

/// Builds an initialized store persisted under `dir`, as the CLI lays it out.
#[allow(dead_code)]
pub fn file_store(dir: &Path, config: StoreConfig) -> SecureKeyStore {
    let preferences = FilePreferences::open(dir.join("preferences.json")).expect("open prefs");
    let key_service = FileKeyService::new(dir.join("keys"));
    let store = SecureKeyStore::new(config, Arc::new(key_service), Arc::new(preferences));
    store.initialize();
    store
}

/// Reads the raw stored record for `key`.
#[allow(dead_code)]
pub fn raw_record(preferences: &dyn PreferenceStore, key: &str) -> EncryptedRecord {
    let stored = preferences
        .get(&format!("{RECORD_KEY_PREFIX}{key}"))
        .expect("read")
        .expect("record present");
    let text = stored.as_text().expect("record is text");
    EncryptedRecord::from_json(text).expect("parse record")
}

/// Overwrites the raw stored record for `key`.
#[allow(dead_code)]
pub fn write_raw_record(preferences: &dyn PreferenceStore, key: &str, record: &EncryptedRecord) {
    preferences
        .put(
            &format!("{RECORD_KEY_PREFIX}{key}"),
            PreferenceValue::Text(record.to_json().expect("serialize")),
        )
        .expect("write");
    preferences.flush().expect("flush");
}
