//! Conversions between binary cipher material and string storage.
//!
//! Ciphertext, nonces and tags are moved through the preference store as
//! standard (padded) Base64. Plaintext crosses the cipher boundary as UTF-8.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::storage::{StorageError, StorageResult};

/// Encodes bytes as standard padded Base64.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a standard padded Base64 string. `field` names the value in the
/// error message.
///
/// # Errors
///
/// Returns [`StorageError::Codec`] if `encoded` is not valid Base64.
pub fn decode_base64(encoded: &str, field: &str) -> StorageResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|err| StorageError::Codec(format!("{field} is not valid base64: {err}")))
}

/// Interprets decrypted bytes as UTF-8 text.
///
/// # Errors
///
/// Returns [`StorageError::Codec`] if the bytes are not valid UTF-8.
pub fn decode_utf8(bytes: Vec<u8>) -> StorageResult<String> {
    String::from_utf8(bytes)
        .map_err(|err| StorageError::Codec(format!("plaintext is not valid utf-8: {err}")))
}
