//! Encrypted key-value storage for string secrets.
//!
//! Values are sealed with AES-256-GCM under a single master key that never
//! leaves the platform [`KeyService`](platform::KeyService). Each value gets a
//! fresh nonce; the resulting `{cipherText, iv, authTag}` record is stored
//! Base64-encoded in a [`PreferenceStore`](platform::PreferenceStore).
//!
//! A persisted installed flag detects a fresh install over leftover data.
//! When the flag is missing and the reset policy is enabled, all records
//! and the master key are wiped before the next operation.
//!
//! ```
//! use secure_key_store::platform::MemoryPlatform;
//! use secure_key_store::{SecureKeyStore, StoreConfig};
//!
//! let platform = MemoryPlatform::new();
//! let store = SecureKeyStore::new(
//!     StoreConfig::default(),
//!     platform.key_service.clone(),
//!     platform.preferences.clone(),
//! );
//! store.initialize();
//!
//! store.set("session", "abc").expect("set");
//! assert_eq!(store.get("session").expect("get"), "abc");
//!
//! let err = store.get("missing").unwrap_err();
//! assert_eq!(err.code(), 404);
//! ```

pub mod codec;
pub mod logger;
pub mod platform;
pub mod storage;

mod error;
pub use error::*;

mod store;
pub use store::*;

pub use storage::{StorageError, StorageResult};
