//! File-backed platform implementations for desktop hosts and the CLI.
//!
//! [`FilePreferences`] keeps a JSON document of all entries. Mutations are
//! staged in memory and [`PreferenceStore::flush`] replaces the file
//! atomically (write to a temp file, fsync, rename). A failed flush rolls the
//! staged entries back to the last document written.
//!
//! [`FileKeyService`] stores one key file per alias. The key material is
//! protected only by filesystem permissions; it stands in for a hardware
//! keystore during development.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use super::software::SoftwareKey;
use super::{CipherRequest, KeyService, KeySpec, PreferenceStore, PreferenceValue};
use crate::storage::{StorageError, StorageResult};

const KEY_FILE_EXTENSION: &str = "key";

/// Writes `bytes` to `path` through a sibling temp file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let mut file = open_private(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

// FilePreferences

/// Preference store persisted as a JSON document.
pub struct FilePreferences {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, PreferenceValue>>,
    durable: RwLock<BTreeMap<String, PreferenceValue>>,
}

impl FilePreferences {
    /// Opens the document at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, PreferenceValue> = match read_optional(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                StorageError::Preferences(format!("{} is corrupted: {err}", path.display()))
            })?,
            None => BTreeMap::new(),
        };
        log::debug!(
            "opened preference store at {} ({} entries)",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            durable: RwLock::new(entries.clone()),
            entries: RwLock::new(entries),
        })
    }

    /// Returns the path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn poisoned() -> StorageError {
    StorageError::Preferences("lock poisoned".to_string())
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> StorageResult<Option<PreferenceValue>> {
        Ok(self.entries.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn put(&self, key: &str, value: PreferenceValue) -> StorageResult<()> {
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.read().map_err(|_| poisoned())?.contains_key(key))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.entries.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let mut durable = self.durable.write().map_err(|_| poisoned())?;

        let written = serde_json::to_vec_pretty(&*entries)
            .map_err(StorageError::from)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        match written {
            Ok(()) => {
                durable.clone_from(&entries);
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "failed to write {}, discarding staged changes: {err}",
                    self.path.display()
                );
                entries.clone_from(&durable);
                Err(err)
            }
        }
    }
}

// FileKeyService

/// Key service persisting software keys as files under a directory.
pub struct FileKeyService {
    dir: PathBuf,
}

impl FileKeyService {
    /// Creates a key service rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the key file path for `alias`.
    #[must_use]
    pub fn key_path(&self, alias: &str) -> PathBuf {
        let name = URL_SAFE_NO_PAD.encode(alias.as_bytes());
        self.dir.join(format!("{name}.{KEY_FILE_EXTENSION}"))
    }

    fn load(&self, alias: &str) -> StorageResult<SoftwareKey> {
        let bytes = read_optional(&self.key_path(alias))?
            .ok_or_else(|| StorageError::KeyUnavailable(format!("no key under alias {alias}")))?;
        let bytes = zeroize::Zeroizing::new(bytes);
        SoftwareKey::from_persisted(&bytes)
    }
}

impl KeyService for FileKeyService {
    fn key_exists(&self, alias: &str) -> StorageResult<bool> {
        Ok(self.key_path(alias).try_exists()?)
    }

    fn generate_key(&self, alias: &str, spec: &KeySpec) -> StorageResult<()> {
        let key = SoftwareKey::generate(spec)?;
        write_atomic(&self.key_path(alias), &key.to_persisted()?)
    }

    fn delete_key(&self, alias: &str) -> StorageResult<()> {
        match fs::remove_file(self.key_path(alias)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn cipher_operate(&self, alias: &str, request: &CipherRequest<'_>) -> StorageResult<Vec<u8>> {
        self.load(alias)?.operate(request)
    }
}
