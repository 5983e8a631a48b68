//! Persisted ciphertext record.

use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};
use crate::codec::decode_base64;
use crate::platform::{GCM_NONCE_SIZE, GCM_TAG_SIZE};

/// One stored value: Base64 ciphertext (without tag), nonce and detached tag.
///
/// Serialized as `{"cipherText": ..., "iv": ..., "authTag": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    /// Base64 AEAD ciphertext, excluding the tag.
    pub cipher_text: String,
    /// Base64 12-byte nonce.
    pub iv: String,
    /// Base64 16-byte authentication tag.
    pub auth_tag: String,
}

/// Binary form of an [`EncryptedRecord`] with validated lengths.
pub(crate) struct DecodedRecord {
    pub(crate) cipher_text: Vec<u8>,
    pub(crate) iv: [u8; GCM_NONCE_SIZE],
    pub(crate) auth_tag: [u8; GCM_TAG_SIZE],
}

impl EncryptedRecord {
    /// Serializes the record to its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored record. All three fields must be present.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] if the text is not a complete record.
    pub fn from_json(stored: &str) -> StorageResult<Self> {
        serde_json::from_str(stored).map_err(|err| StorageError::InvalidRecord(err.to_string()))
    }

    /// Decodes all three fields and checks the nonce and tag lengths.
    pub(crate) fn decode(&self) -> StorageResult<DecodedRecord> {
        let cipher_text = decode_base64(&self.cipher_text, "cipherText")?;
        let iv = decode_fixed::<GCM_NONCE_SIZE>(&self.iv, "iv")?;
        let auth_tag = decode_fixed::<GCM_TAG_SIZE>(&self.auth_tag, "authTag")?;
        Ok(DecodedRecord {
            cipher_text,
            iv,
            auth_tag,
        })
    }
}

fn decode_fixed<const N: usize>(encoded: &str, field: &str) -> StorageResult<[u8; N]> {
    let bytes = decode_base64(encoded, field)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        StorageError::InvalidRecord(format!(
            "{field} length mismatch: expected {N}, got {}",
            bytes.len()
        ))
    })
}
