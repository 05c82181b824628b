// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process key store. Keys vanish with the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use zeroize::Zeroizing;

use super::{
    aead_open, aead_seal, generate_master_key, EncryptedBlob, EnvelopeError, KeyStoreProvider,
    MASTER_KEY_LEN,
};

/// Software-only [`KeyStoreProvider`].
///
/// Can be locked to mimic a hardware store that needs the device unlocked:
/// while locked every operation fails with
/// [`EnvelopeError::AuthenticationRequired`].
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, Zeroizing<[u8; MASTER_KEY_LEN]>>>,
    locked: AtomicBool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn check_unlocked(&self) -> Result<(), EnvelopeError> {
        if self.locked.load(Ordering::SeqCst) {
            Err(EnvelopeError::AuthenticationRequired)
        } else {
            Ok(())
        }
    }
}

fn poisoned<T>(_: T) -> EnvelopeError {
    EnvelopeError::StorageUnavailable("key store lock poisoned".into())
}

impl KeyStoreProvider for MemoryKeyStore {
    fn ensure_key(&self, alias: &str) -> Result<(), EnvelopeError> {
        self.check_unlocked()?;
        let mut keys = self.keys.write().map_err(poisoned)?;
        if !keys.contains_key(alias) {
            keys.insert(alias.to_string(), generate_master_key()?);
        }
        Ok(())
    }

    fn seal(&self, alias: &str, plaintext: &[u8]) -> Result<EncryptedBlob, EnvelopeError> {
        self.check_unlocked()?;
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(alias).ok_or_else(|| {
            EnvelopeError::StorageUnavailable(format!("no master key for alias {alias}"))
        })?;
        aead_seal(key, alias, plaintext)
    }

    fn open(&self, alias: &str, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        self.check_unlocked()?;
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(alias).ok_or(EnvelopeError::DecryptionFailure)?;
        aead_open(key, alias, blob)
    }

    fn has_key(&self, alias: &str) -> Result<bool, EnvelopeError> {
        Ok(self.keys.read().map_err(poisoned)?.contains_key(alias))
    }

    fn delete_key(&self, alias: &str) -> Result<(), EnvelopeError> {
        self.keys.write().map_err(poisoned)?.remove(alias);
        Ok(())
    }
}
