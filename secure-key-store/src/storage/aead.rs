//! Per-value authenticated encryption under the master key.
//!
//! Each value is sealed with AES-256-GCM and a fresh 12-byte nonce drawn from
//! the OS CSPRNG. The key service returns `ciphertext || tag`; the tag is
//! split off and stored separately.

use rand::{rngs::OsRng, RngCore};

use super::error::{StorageError, StorageResult};
use super::keys::MasterKeyManager;
use super::record::EncryptedRecord;
use crate::codec::{decode_utf8, encode_base64};
use crate::platform::{CipherRequest, GCM_NONCE_SIZE, GCM_TAG_SIZE};

/// Encrypts and decrypts single values with the master key.
pub struct AeadEngine {
    keys: MasterKeyManager,
}

impl AeadEngine {
    /// Creates an engine over `keys`.
    #[must_use]
    pub const fn new(keys: MasterKeyManager) -> Self {
        Self { keys }
    }

    /// The master key manager backing this engine.
    #[must_use]
    pub const fn keys(&self) -> &MasterKeyManager {
        &self.keys
    }

    /// Seals `plain_text` into a record with a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key is missing or the key service fails.
    pub fn encrypt(&self, plain_text: &str) -> StorageResult<EncryptedRecord> {
        let iv = generate_nonce();
        let sealed = self
            .keys
            .operate(&CipherRequest::encrypt(&iv, plain_text.as_bytes()))?;
        if sealed.len() < GCM_TAG_SIZE {
            return Err(StorageError::Crypto(format!(
                "key service output too short: {} bytes",
                sealed.len()
            )));
        }
        let (cipher_text, auth_tag) = sealed.split_at(sealed.len() - GCM_TAG_SIZE);
        Ok(EncryptedRecord {
            cipher_text: encode_base64(cipher_text),
            iv: encode_base64(&iv),
            auth_tag: encode_base64(auth_tag),
        })
    }

    /// Opens `record` and returns the plaintext.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed, the tag does not
    /// authenticate, the master key is missing, or the plaintext is not UTF-8.
    pub fn decrypt(&self, record: &EncryptedRecord) -> StorageResult<String> {
        let decoded = record.decode()?;
        let plain = self.keys.operate(&CipherRequest::decrypt(
            &decoded.iv,
            &decoded.auth_tag,
            &decoded.cipher_text,
        ))?;
        decode_utf8(plain)
    }
}

fn generate_nonce() -> [u8; GCM_NONCE_SIZE] {
    let mut nonce = [0u8; GCM_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
