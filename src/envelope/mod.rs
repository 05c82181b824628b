// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Envelope Encryption
//!
//! Every secret that reaches the wallet store is sealed here first.
//!
//! ## Model
//!
//! - A master key lives inside a [`KeyStoreProvider`] and never leaves it.
//! - [`EnvelopeService`] binds one master-key alias and is the only component
//!   that ever holds plaintext secret material.
//! - Blobs are ChaCha20-Poly1305 with a fresh 12-byte random nonce per seal and
//!   the master-key alias as associated data.
//!
//! Any authentication failure, wrong-length nonce, alias mismatch or missing
//! master key surfaces as [`EnvelopeError::DecryptionFailure`]. Callers must
//! treat it like a wrong password and never retry automatically.
//!
//! ## Providers
//!
//! | Provider           | Backing                               |
//! |--------------------|---------------------------------------|
//! | [`MemoryKeyStore`] | process memory (tests, ephemeral use) |
//! | [`FileKeyStore`]   | `0600` key file under the data dir    |
//!
//! A hardware-backed provider is any other implementation of the trait,
//! injected at construction time.

pub mod file;
pub mod memory;

use std::sync::Arc;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// AEAD nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Errors from sealing, opening or provisioning master keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("decryption failed")]
    DecryptionFailure,

    #[error("key store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("key store requires device authentication")]
    AuthenticationRequired,

    #[error("secure random source unavailable")]
    EntropySourceUnavailable,
}

/// A sealed secret. Opaque outside this module.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    pub alias_key: String,
}

impl EncryptedBlob {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl std::fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("alias_key", &self.alias_key)
            .finish_non_exhaustive()
    }
}

/// Capability over a secure key store holding non-exportable master keys.
pub trait KeyStoreProvider: Send + Sync {
    /// Provision a master key for `alias`. No-op if one already exists.
    fn ensure_key(&self, alias: &str) -> Result<(), EnvelopeError>;

    /// Authenticated-encrypt `plaintext` under the key named `alias`.
    fn seal(&self, alias: &str, plaintext: &[u8]) -> Result<EncryptedBlob, EnvelopeError>;

    /// Authenticated-decrypt. Fails closed.
    fn open(&self, alias: &str, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, EnvelopeError>;

    fn has_key(&self, alias: &str) -> Result<bool, EnvelopeError>;

    fn delete_key(&self, alias: &str) -> Result<(), EnvelopeError>;
}

/// Seals and opens secrets under one master-key alias.
#[derive(Clone)]
pub struct EnvelopeService {
    provider: Arc<dyn KeyStoreProvider>,
    alias: String,
}

impl EnvelopeService {
    /// Bind `alias` and make sure its master key exists.
    pub fn new(
        provider: Arc<dyn KeyStoreProvider>,
        alias: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        let service = Self {
            provider,
            alias: alias.into(),
        };
        service.ensure_master_key()?;
        Ok(service)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn ensure_master_key(&self) -> Result<(), EnvelopeError> {
        self.provider.ensure_key(&self.alias)
    }

    /// Seal and consume `plaintext`; the buffer is wiped when this returns.
    pub fn seal(&self, plaintext: Zeroizing<Vec<u8>>) -> Result<EncryptedBlob, EnvelopeError> {
        self.provider.seal(&self.alias, &plaintext)
    }

    pub fn open(&self, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        if blob.alias_key != self.alias {
            return Err(EnvelopeError::DecryptionFailure);
        }
        self.provider.open(&self.alias, blob)
    }

    /// True if the master key is present and usable.
    pub fn is_available(&self) -> bool {
        matches!(self.provider.has_key(&self.alias), Ok(true))
    }
}

impl std::fmt::Debug for EnvelopeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeService")
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// AEAD primitives shared by software providers
// =============================================================================

pub(crate) fn generate_master_key() -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, EnvelopeError> {
    let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
    OsRng
        .try_fill_bytes(&mut key[..])
        .map_err(|_| EnvelopeError::EntropySourceUnavailable)?;
    Ok(key)
}

pub(crate) fn aead_seal(
    key: &[u8; MASTER_KEY_LEN],
    alias: &str,
    plaintext: &[u8],
) -> Result<EncryptedBlob, EnvelopeError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| EnvelopeError::EntropySourceUnavailable)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: alias.as_bytes(),
            },
        )
        .map_err(|_| EnvelopeError::StorageUnavailable("encryption failed".into()))?;

    Ok(EncryptedBlob {
        ciphertext,
        nonce: nonce.to_vec(),
        alias_key: alias.to_string(),
    })
}

pub(crate) fn aead_open(
    key: &[u8; MASTER_KEY_LEN],
    alias: &str,
    blob: &EncryptedBlob,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if blob.nonce.len() != NONCE_LEN || blob.alias_key != alias {
        return Err(EnvelopeError::DecryptionFailure);
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(&blob.nonce),
            Payload {
                msg: &blob.ciphertext,
                aad: alias.as_bytes(),
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| EnvelopeError::DecryptionFailure)
}

mod b64 {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Base64::decode_vec(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn service() -> EnvelopeService {
        EnvelopeService::new(Arc::new(MemoryKeyStore::new()), "test_master").unwrap()
    }

    #[test]
    fn seal_then_open_roundtrips() {
        let envelope = service();
        let blob = envelope
            .seal(Zeroizing::new(b"correct horse".to_vec()))
            .unwrap();
        assert_eq!(blob.alias_key, "test_master");
        assert_eq!(blob.nonce.len(), NONCE_LEN);
        assert_ne!(blob.ciphertext, b"correct horse");
        assert_eq!(envelope.open(&blob).unwrap().as_slice(), b"correct horse");
    }

    #[test]
    fn nonces_are_fresh_per_seal() {
        let envelope = service();
        let a = envelope.seal(Zeroizing::new(vec![7u8; 32])).unwrap();
        let b = envelope.seal(Zeroizing::new(vec![7u8; 32])).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_nonce_length_fails_closed() {
        let envelope = service();
        let mut blob = envelope.seal(Zeroizing::new(b"x".to_vec())).unwrap();
        blob.nonce.pop();
        assert_eq!(envelope.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);
        blob.nonce.clear();
        assert_eq!(envelope.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);
    }

    #[test]
    fn blob_bound_to_alias() {
        let provider: Arc<dyn KeyStoreProvider> = Arc::new(MemoryKeyStore::new());
        let a = EnvelopeService::new(provider.clone(), "alias_a").unwrap();
        let b = EnvelopeService::new(provider, "alias_b").unwrap();

        let blob = a.seal(Zeroizing::new(b"secret".to_vec())).unwrap();
        assert_eq!(b.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);

        let mut relabeled = blob.clone();
        relabeled.alias_key = "alias_b".into();
        assert_eq!(b.open(&relabeled).unwrap_err(), EnvelopeError::DecryptionFailure);
    }

    #[test]
    fn missing_master_key_fails_closed() {
        let provider = Arc::new(MemoryKeyStore::new());
        let envelope = EnvelopeService::new(provider.clone(), "gone").unwrap();
        let blob = envelope.seal(Zeroizing::new(b"secret".to_vec())).unwrap();

        provider.delete_key("gone").unwrap();
        assert!(!envelope.is_available());
        assert_eq!(envelope.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);
    }

    #[test]
    fn blob_serializes_as_base64_json() {
        let envelope = service();
        let blob = envelope.seal(Zeroizing::new(vec![1, 2, 3])).unwrap();
        let bytes = blob.to_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["ciphertext"].is_string());
        assert!(json["nonce"].is_string());
        assert_eq!(json["alias_key"], "test_master");
        assert_eq!(EncryptedBlob::from_bytes(&bytes).unwrap(), blob);
    }

    #[test]
    fn debug_hides_ciphertext() {
        let envelope = service();
        let blob = envelope.seal(Zeroizing::new(vec![0xAB; 4])).unwrap();
        assert!(format!("{blob:?}").contains("ciphertext_len"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtrip_arbitrary_plaintext(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            let envelope = service();
            let blob = envelope.seal(Zeroizing::new(data.clone())).unwrap();
            let opened = envelope.open(&blob).unwrap();
            prop_assert_eq!(opened.as_slice(), data.as_slice());
        }

        #[test]
        fn any_ciphertext_bit_flip_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 0..=256),
            pick in any::<usize>(),
            bit in 0u8..8,
        ) {
            let envelope = service();
            let mut blob = envelope.seal(Zeroizing::new(data)).unwrap();
            let idx = pick % blob.ciphertext.len();
            blob.ciphertext[idx] ^= 1 << bit;
            prop_assert_eq!(envelope.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);
        }

        #[test]
        fn any_nonce_bit_flip_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 0..=256),
            pick in 0usize..NONCE_LEN,
            bit in 0u8..8,
        ) {
            let envelope = service();
            let mut blob = envelope.seal(Zeroizing::new(data)).unwrap();
            blob.nonce[pick] ^= 1 << bit;
            prop_assert_eq!(envelope.open(&blob).unwrap_err(), EnvelopeError::DecryptionFailure);
        }
    }
}
