//! Key service trait for the protected master key.
//!
//! The key service owns the master key. The store only ever refers to it by
//! alias: key material is never exported to the caller.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::storage::StorageResult;

/// AES-256 key size in bits.
pub const AES_256_KEY_SIZE: u32 = 256;

/// GCM nonce length in bytes.
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM authentication tag length in bytes.
pub const GCM_TAG_SIZE: usize = 16;

/// Key algorithm requested at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// AES block cipher.
    Aes,
}

/// Block cipher mode the key is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Galois/Counter Mode.
    Gcm,
}

/// Padding scheme the key is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// No padding (stream-like AEAD modes).
    None,
}

/// Set of operations a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPurpose(u8);

impl KeyPurpose {
    /// The key may encrypt.
    pub const ENCRYPT: Self = Self(0b01);
    /// The key may decrypt.
    pub const DECRYPT: Self = Self(0b10);

    /// Returns `true` if every purpose in `other` is granted by `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for KeyPurpose {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Generation parameters for a key held by the key service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    /// Key algorithm.
    pub algorithm: KeyAlgorithm,
    /// Key size in bits.
    pub key_size_bits: u32,
    /// Operations the key is authorized for.
    pub purposes: KeyPurpose,
    /// Block mode the key is restricted to.
    pub block_mode: BlockMode,
    /// Padding the key is restricted to.
    pub padding: Padding,
}

impl KeySpec {
    /// The master key specification: AES-256, encrypt and decrypt, GCM, no padding.
    #[must_use]
    pub fn aes_256_gcm() -> Self {
        Self {
            algorithm: KeyAlgorithm::Aes,
            key_size_bits: AES_256_KEY_SIZE,
            purposes: KeyPurpose::ENCRYPT | KeyPurpose::DECRYPT,
            block_mode: BlockMode::Gcm,
            padding: Padding::None,
        }
    }
}

/// Cipher used for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// AES-256 in GCM mode without padding.
    Aes256Gcm,
}

/// Direction of a cipher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    /// Seal plaintext.
    Encrypt,
    /// Open ciphertext.
    Decrypt,
}

impl CipherDirection {
    /// Purpose a key must carry to perform this operation.
    #[must_use]
    pub const fn required_purpose(self) -> KeyPurpose {
        match self {
            Self::Encrypt => KeyPurpose::ENCRYPT,
            Self::Decrypt => KeyPurpose::DECRYPT,
        }
    }
}

/// A single session-style cipher operation (init + finish) against a key.
#[derive(Debug, Clone, Copy)]
pub struct CipherRequest<'a> {
    /// Whether to encrypt or decrypt.
    pub direction: CipherDirection,
    /// Cipher to apply.
    pub algorithm: CipherAlgorithm,
    /// 12-byte GCM nonce.
    pub nonce: &'a [u8],
    /// Detached 16-byte authentication tag; required for decryption.
    pub tag: Option<&'a [u8]>,
    /// Input data: plaintext for encryption, ciphertext (without tag) for decryption.
    pub data: &'a [u8],
}

impl<'a> CipherRequest<'a> {
    /// Builds an AES-256-GCM encryption request.
    #[must_use]
    pub const fn encrypt(nonce: &'a [u8], data: &'a [u8]) -> Self {
        Self {
            direction: CipherDirection::Encrypt,
            algorithm: CipherAlgorithm::Aes256Gcm,
            nonce,
            tag: None,
            data,
        }
    }

    /// Builds an AES-256-GCM decryption request with a detached tag.
    #[must_use]
    pub const fn decrypt(nonce: &'a [u8], tag: &'a [u8], data: &'a [u8]) -> Self {
        Self {
            direction: CipherDirection::Decrypt,
            algorithm: CipherAlgorithm::Aes256Gcm,
            nonce,
            tag: Some(tag),
            data,
        }
    }
}

/// Protected key-management service holding the master key.
///
/// Platform implementations should use hardware-backed keystores where available.
///
/// # Security Requirements
///
/// - Key material MUST NOT be exportable through this interface.
/// - Implementations MUST enforce the purposes and mode fixed at generation.
/// - Encryption output is the ciphertext followed by the 16-byte GCM tag.
pub trait KeyService: Send + Sync {
    /// Returns whether a key exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key service cannot be queried.
    fn key_exists(&self, alias: &str) -> StorageResult<bool>;

    /// Generates a new key under `alias`, replacing any existing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is unsupported or generation fails.
    fn generate_key(&self, alias: &str, spec: &KeySpec) -> StorageResult<()>;

    /// Deletes the key under `alias`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the key service refuses the deletion.
    fn delete_key(&self, alias: &str) -> StorageResult<()>;

    /// Runs a cipher operation with the key under `alias`.
    ///
    /// # Returns
    ///
    /// For encryption, `ciphertext || tag`. For decryption, the plaintext.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key is absent
    /// - The key is not authorized for the requested direction
    /// - Authentication fails (tampered data, wrong nonce or tag)
    fn cipher_operate(&self, alias: &str, request: &CipherRequest<'_>) -> StorageResult<Vec<u8>>;
}
