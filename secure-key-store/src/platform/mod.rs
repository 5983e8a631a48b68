//! Platform abstraction traits for the secure key store.
//!
//! The store is platform-agnostic. The two capabilities it consumes from the
//! host are abstracted behind traits:
//!
//! - [`KeyService`]: a protected key-management service that generates and
//!   holds the master key and performs cipher operations with it
//! - [`PreferenceStore`]: a persistent string-keyed mapping used to hold
//!   ciphertext records and the installed flag
//!
//! # Platform Implementations
//!
//! ## Mobile hosts
//! - `KeyService`: hardware-backed keystore (HUKS, Android Keystore, Keychain)
//! - `PreferenceStore`: the platform's preferences/settings store
//!
//! ## Desktop and development
//! - `KeyService`: [`FileKeyService`], raw key material in owner-only files
//! - `PreferenceStore`: [`FilePreferences`], a JSON document written atomically
//!
//! ## Tests
//! - [`MemoryKeyService`] and [`MemoryPreferences`]

mod file;
mod key_service;
pub mod memory;
mod preferences;
mod software;

pub use file::{FileKeyService, FilePreferences};
pub use key_service::{
    BlockMode, CipherAlgorithm, CipherDirection, CipherRequest, KeyAlgorithm, KeyPurpose,
    KeyService, KeySpec, Padding, AES_256_KEY_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE,
};
pub use memory::{MemoryKeyService, MemoryPlatform, MemoryPreferences};
pub use preferences::{PreferenceStore, PreferenceValue};
