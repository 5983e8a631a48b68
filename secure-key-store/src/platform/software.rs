//! Software AES-256-GCM key shared by the in-memory and file-backed key services.
//!
//! Enforces the [`KeySpec`] recorded at generation the way a hardware keystore
//! would: unsupported specs are refused and operations outside the granted
//! purposes fail.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::key_service::{
    BlockMode, CipherAlgorithm, CipherDirection, CipherRequest, KeyAlgorithm, KeySpec, Padding,
    AES_256_KEY_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE,
};
use crate::codec::{decode_base64, encode_base64};
use crate::storage::{StorageError, StorageResult};

const KEY_SIZE: usize = 32;

/// Key material plus the spec it was generated under.
pub(crate) struct SoftwareKey {
    bytes: Zeroizing<[u8; KEY_SIZE]>,
    spec: KeySpec,
}

/// On-disk form of a [`SoftwareKey`].
#[derive(Serialize, Deserialize)]
struct PersistedKey {
    spec: KeySpec,
    key: String,
}

impl SoftwareKey {
    /// Generates fresh key material for `spec`.
    pub(crate) fn generate(spec: &KeySpec) -> StorageResult<Self> {
        validate_spec(spec)?;
        let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng.fill_bytes(&mut bytes[..]);
        Ok(Self { bytes, spec: *spec })
    }

    /// Serializes the key for a file-backed key service.
    pub(crate) fn to_persisted(&self) -> StorageResult<Zeroizing<Vec<u8>>> {
        let mut persisted = PersistedKey {
            spec: self.spec,
            key: encode_base64(&self.bytes[..]),
        };
        let bytes = serde_json::to_vec(&persisted);
        persisted.key.zeroize();
        Ok(Zeroizing::new(bytes?))
    }

    /// Parses a key written by [`SoftwareKey::to_persisted`].
    pub(crate) fn from_persisted(bytes: &[u8]) -> StorageResult<Self> {
        let mut persisted: PersistedKey = serde_json::from_slice(bytes)?;
        let decoded = Zeroizing::new(decode_base64(&persisted.key, "key")?);
        persisted.key.zeroize();
        validate_spec(&persisted.spec)?;
        if decoded.len() != KEY_SIZE {
            return Err(StorageError::KeyService(format!(
                "stored key length mismatch: expected {KEY_SIZE}, got {}",
                decoded.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&decoded);
        Ok(Self {
            bytes: key,
            spec: persisted.spec,
        })
    }

    /// Runs `request` with this key.
    pub(crate) fn operate(&self, request: &CipherRequest<'_>) -> StorageResult<Vec<u8>> {
        let CipherAlgorithm::Aes256Gcm = request.algorithm;
        if !self.spec.purposes.contains(request.direction.required_purpose()) {
            return Err(StorageError::KeyService(format!(
                "key is not authorized for {:?}",
                request.direction
            )));
        }
        if request.nonce.len() != GCM_NONCE_SIZE {
            return Err(StorageError::Crypto(format!(
                "nonce length mismatch: expected {GCM_NONCE_SIZE}, got {}",
                request.nonce.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.bytes[..])
            .map_err(|err| StorageError::KeyService(err.to_string()))?;
        let nonce = Nonce::from_slice(request.nonce);

        match request.direction {
            CipherDirection::Encrypt => {
                let mut buffer = request.data.to_vec();
                let tag = cipher
                    .encrypt_in_place_detached(nonce, b"", &mut buffer)
                    .map_err(|_| StorageError::Crypto("encryption failed".to_string()))?;
                buffer.extend_from_slice(&tag);
                Ok(buffer)
            }
            CipherDirection::Decrypt => {
                let tag = request
                    .tag
                    .ok_or_else(|| StorageError::Crypto("missing authentication tag".to_string()))?;
                if tag.len() != GCM_TAG_SIZE {
                    return Err(StorageError::Crypto(format!(
                        "tag length mismatch: expected {GCM_TAG_SIZE}, got {}",
                        tag.len()
                    )));
                }
                let mut buffer = request.data.to_vec();
                let result =
                    cipher.decrypt_in_place_detached(nonce, b"", &mut buffer, Tag::from_slice(tag));
                if result.is_err() {
                    buffer.zeroize();
                    return Err(StorageError::Crypto("authentication failed".to_string()));
                }
                Ok(buffer)
            }
        }
    }
}

fn validate_spec(spec: &KeySpec) -> StorageResult<()> {
    let KeyAlgorithm::Aes = spec.algorithm;
    let BlockMode::Gcm = spec.block_mode;
    let Padding::None = spec.padding;
    if spec.key_size_bits != AES_256_KEY_SIZE {
        return Err(StorageError::KeyService(format!(
            "unsupported key size: {} bits",
            spec.key_size_bits
        )));
    }
    Ok(())
}
