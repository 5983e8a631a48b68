//! Storage primitives: master key manager, AEAD engine and record adapter.

pub mod aead;
pub mod error;
pub mod keys;
pub mod record;
pub mod records;

pub use aead::AeadEngine;
pub use error::{StorageError, StorageResult};
pub use keys::MasterKeyManager;
pub use record::EncryptedRecord;
pub use records::RecordStore;

/// Preference key holding the installed flag. Lives outside the record namespace.
pub const INSTALLED_FLAG_KEY: &str = "RnSksIsAppInstalled";

/// Prefix applied to every caller key before it reaches the preference store.
pub const RECORD_KEY_PREFIX: &str = "sks.record.";
