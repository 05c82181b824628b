// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SLIP-0010 Ed25519 key derivation and raw secret-key import.
//!
//! ```text
//! master = HMAC-SHA512("ed25519 seed", seed)
//! child  = HMAC-SHA512(chain_code, 0x00 || key || be32(index | 0x8000_0000))
//! ```
//!
//! Ed25519 has no public-parent derivation, so every segment is derived
//! hardened: `m/44'/297'/0'/0/0` and `m/44'/297'/0'/0'/0'` are the same path.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

pub use ed25519_dalek::Signature;

use super::codec::{derive_address, encode_key, Address, KeyKind, KeyVersion, KEY_LEN};
use super::mnemonic::Seed;
use super::KeyError;

type HmacSha512 = Hmac<Sha512>;

const HARDENED_OFFSET: u32 = 0x8000_0000;
const MASTER_HMAC_KEY: &[u8] = b"ed25519 seed";
const MAX_DEPTH: usize = 10;

/// BIP-44 purpose segment.
pub const PURPOSE: u32 = 44;

/// Registered coin type used by default.
pub const DEFAULT_COIN_TYPE: u32 = 297;

// =============================================================================
// Derivation path
// =============================================================================

/// A parsed `m/a'/b'/...` path. Indices are stored without the hardened bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    indices: Vec<u32>,
}

impl DerivationPath {
    /// `m/44'/<coin_type>'/0'/0'/<index>'`
    pub fn account(coin_type: u32, index: u32) -> Result<Self, KeyError> {
        for value in [coin_type, index] {
            if value >= HARDENED_OFFSET {
                return Err(KeyError::InvalidPath(format!(
                    "index {value} out of range"
                )));
            }
        }
        Ok(Self {
            indices: vec![PURPOSE, coin_type, 0, 0, index],
        })
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Last segment of the path, the per-wallet account index.
    pub fn account_index(&self) -> Option<u32> {
        self.indices.last().copied()
    }
}

impl FromStr for DerivationPath {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.trim().split('/');
        if segments.next() != Some("m") {
            return Err(KeyError::InvalidPath("path must start with 'm'".into()));
        }

        let mut indices = Vec::new();
        for segment in segments {
            let digits = segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
                .unwrap_or(segment);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(KeyError::InvalidPath(format!(
                    "invalid segment '{segment}'"
                )));
            }
            let index: u32 = digits
                .parse()
                .map_err(|_| KeyError::InvalidPath(format!("invalid segment '{segment}'")))?;
            if index >= HARDENED_OFFSET {
                return Err(KeyError::InvalidPath(format!(
                    "index {index} out of range"
                )));
            }
            indices.push(index);
        }

        if indices.len() > MAX_DEPTH {
            return Err(KeyError::InvalidPath(format!(
                "path deeper than {MAX_DEPTH} segments"
            )));
        }

        Ok(Self { indices })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.indices {
            write!(f, "/{index}'")?;
        }
        Ok(())
    }
}

// =============================================================================
// Key pair
// =============================================================================

/// An Ed25519 signing identity plus the version tag it is encoded and
/// signs under. The secret half is wiped on drop.
pub struct KeyPair {
    signing: SigningKey,
    version: KeyVersion,
}

impl KeyPair {
    /// Walk `path` from `seed`. Same inputs always give the same pair.
    pub fn derive(seed: &Seed, path: &DerivationPath) -> Result<Self, KeyError> {
        let (mut key, mut chain_code) = split(hmac_sha512(MASTER_HMAC_KEY, seed.as_bytes())?);

        for &index in path.indices() {
            let mut data = Zeroizing::new([0u8; 1 + KEY_LEN + 4]);
            data[1..1 + KEY_LEN].copy_from_slice(&key[..]);
            data[1 + KEY_LEN..].copy_from_slice(&(index | HARDENED_OFFSET).to_be_bytes());
            (key, chain_code) = split(hmac_sha512(&chain_code[..], &data[..])?);
        }

        Ok(Self::import_raw_secret(&key, KeyVersion::CURRENT))
    }

    /// Wrap an externally supplied secret. The public key is always
    /// recomputed from the secret.
    pub fn import_raw_secret(secret: &[u8; KEY_LEN], version: KeyVersion) -> Self {
        Self {
            signing: SigningKey::from_bytes(secret),
            version,
        }
    }

    /// Import a secret and cross-check it against the public key the
    /// caller expects. Fails with [`KeyError::KeyMismatch`] on disagreement.
    pub fn import_verified(
        secret: &[u8; KEY_LEN],
        version: KeyVersion,
        expected_public: Option<&[u8; KEY_LEN]>,
    ) -> Result<Self, KeyError> {
        let pair = Self::import_raw_secret(secret, version);
        match expected_public {
            Some(expected) if pair.public_key() != *expected => Err(KeyError::KeyMismatch),
            _ => Ok(pair),
        }
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn public_key(&self) -> [u8; KEY_LEN] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; KEY_LEN]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    pub fn encoded_public_key(&self) -> String {
        encode_key(&self.public_key(), KeyKind::Public, self.version)
    }

    pub fn encoded_secret_key(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_key(&self.secret_bytes(), KeyKind::Secret, self.version))
    }

    pub fn address(&self) -> Address {
        derive_address(&self.public_key(), self.version)
    }

    /// Sign under this pair's version: V0 signs the message, V1 its SHA-256.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self.version {
            KeyVersion::V0 => self.signing.sign(message),
            KeyVersion::V1 => self.signing.sign(&Sha256::digest(message)),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.encoded_public_key())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Check `signature` over `message` with the algorithm selected by `version`.
/// Public keys that are not valid curve points never verify.
pub fn verify(
    public_key: &[u8; KEY_LEN],
    version: KeyVersion,
    message: &[u8],
    signature: &Signature,
) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    match version {
        KeyVersion::V0 => key.verify(message, signature).is_ok(),
        KeyVersion::V1 => key.verify(&Sha256::digest(message), signature).is_ok(),
    }
}

/// Parse a 64-byte signature.
pub fn signature_from_slice(bytes: &[u8]) -> Result<Signature, KeyError> {
    Signature::from_slice(bytes).map_err(|_| KeyError::InvalidSignature)
}

// =============================================================================
// HMAC helpers
// =============================================================================

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<Zeroizing<[u8; 64]>, KeyError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| KeyError::InvalidPath(format!("hmac key rejected: {e}")))?;
    mac.update(data);
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn split(i: Zeroizing<[u8; 64]>) -> (Zeroizing<[u8; KEY_LEN]>, Zeroizing<[u8; KEY_LEN]>) {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut chain_code = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&i[..KEY_LEN]);
    chain_code.copy_from_slice(&i[KEY_LEN..]);
    (key, chain_code)
}
