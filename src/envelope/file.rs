// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key store persisted to a single owner-only file.
//!
//! For host deployments without secure hardware. The file holds base64
//! master keys keyed by alias:
//!
//! ```text
//! { "keys": { "relational_vault_master": "q83v..." } }
//! ```
//!
//! Writes go to a temp file first and are renamed into place. On Unix the
//! file is created with mode `0600`.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::{
    aead_open, aead_seal, generate_master_key, EncryptedBlob, EnvelopeError, KeyStoreProvider,
    MASTER_KEY_LEN,
};

#[derive(Default, Serialize, Deserialize)]
struct KeyFile {
    keys: BTreeMap<String, String>,
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        for value in self.keys.values_mut() {
            value.zeroize();
        }
    }
}

/// File-backed [`KeyStoreProvider`].
pub struct FileKeyStore {
    path: PathBuf,
    keys: RwLock<HashMap<String, Zeroizing<[u8; MASTER_KEY_LEN]>>>,
}

fn unavailable(e: impl std::fmt::Display) -> EnvelopeError {
    EnvelopeError::StorageUnavailable(e.to_string())
}

impl FileKeyStore {
    /// Load keys from `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let path = path.as_ref().to_path_buf();
        let keys = match fs::read(&path) {
            Ok(bytes) => {
                let bytes = Zeroizing::new(bytes);
                let file: KeyFile = serde_json::from_slice(&bytes).map_err(unavailable)?;
                decode_keys(&file)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(unavailable(e)),
        };

        Ok(Self {
            path,
            keys: RwLock::new(keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, keys: &HashMap<String, Zeroizing<[u8; MASTER_KEY_LEN]>>) -> Result<(), EnvelopeError> {
        let file = KeyFile {
            keys: keys
                .iter()
                .map(|(alias, key)| (alias.clone(), Base64::encode_string(&key[..])))
                .collect(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let handle = create_private(&temp_path).map_err(unavailable)?;
            let mut writer = BufWriter::new(handle);
            serde_json::to_writer(&mut writer, &file).map_err(unavailable)?;
            writer.flush().map_err(unavailable)?;
        }
        fs::rename(&temp_path, &self.path).map_err(unavailable)?;
        Ok(())
    }
}

fn decode_keys(
    file: &KeyFile,
) -> Result<HashMap<String, Zeroizing<[u8; MASTER_KEY_LEN]>>, EnvelopeError> {
    let mut keys = HashMap::with_capacity(file.keys.len());
    for (alias, encoded) in &file.keys {
        let raw = Zeroizing::new(Base64::decode_vec(encoded).map_err(unavailable)?);
        if raw.len() != MASTER_KEY_LEN {
            return Err(EnvelopeError::StorageUnavailable(format!(
                "master key for alias {alias} has wrong length"
            )));
        }
        let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        key.copy_from_slice(&raw);
        keys.insert(alias.clone(), key);
    }
    Ok(keys)
}

#[cfg(unix)]
pub(crate) fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
pub(crate) fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn poisoned<T>(_: T) -> EnvelopeError {
    EnvelopeError::StorageUnavailable("key store lock poisoned".into())
}

impl KeyStoreProvider for FileKeyStore {
    fn ensure_key(&self, alias: &str) -> Result<(), EnvelopeError> {
        let mut keys = self.keys.write().map_err(poisoned)?;
        if keys.contains_key(alias) {
            return Ok(());
        }
        keys.insert(alias.to_string(), generate_master_key()?);
        if let Err(e) = self.persist(&keys) {
            keys.remove(alias);
            return Err(e);
        }
        tracing::info!(alias = %alias, "Provisioned master key");
        Ok(())
    }

    fn seal(&self, alias: &str, plaintext: &[u8]) -> Result<EncryptedBlob, EnvelopeError> {
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(alias).ok_or_else(|| {
            EnvelopeError::StorageUnavailable(format!("no master key for alias {alias}"))
        })?;
        aead_seal(key, alias, plaintext)
    }

    fn open(&self, alias: &str, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(alias).ok_or(EnvelopeError::DecryptionFailure)?;
        aead_open(key, alias, blob)
    }

    fn has_key(&self, alias: &str) -> Result<bool, EnvelopeError> {
        Ok(self.keys.read().map_err(poisoned)?.contains_key(alias))
    }

    fn delete_key(&self, alias: &str) -> Result<(), EnvelopeError> {
        let mut keys = self.keys.write().map_err(poisoned)?;
        let Some(removed) = keys.remove(alias) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&keys) {
            keys.insert(alias.to_string(), removed);
            return Err(e);
        }
        tracing::info!(alias = %alias, "Deleted master key");
        Ok(())
    }
}
