// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Versioned, checksummed text encoding for keys and addresses.
//!
//! ## Format
//!
//! ```text
//! <prefix> base58( varint(version) || body || checksum )
//! checksum = SHA-256(SHA-256(varint(version) || body))[..4]
//! ```
//!
//! | Prefix | Body                       |
//! |--------|----------------------------|
//! | `P`    | 32-byte Ed25519 public key |
//! | `S`    | 32-byte Ed25519 secret key |
//! | `AU`   | SHA-256 of the public key  |
//!
//! A version-0 payload starts with a zero byte, so version-0 keys always
//! render as `P1…` / `S1…`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use zeroize::Zeroizing;

/// Byte length of every key body (public or secret).
pub const KEY_LEN: usize = 32;

/// Text prefix for user addresses.
pub const ADDRESS_PREFIX: &str = "AU";

const CHECKSUM_LEN: usize = 4;

/// Errors produced while decoding a textual key or address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized prefix")]
    BadPrefix,

    #[error("invalid base58 text: {0}")]
    InvalidBase58(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unsupported version tag {0}")]
    UnsupportedVersion(u64),

    #[error("invalid body length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("payload too short")]
    Truncated,
}

/// Key generation tag carried next to every key.
///
/// Both generations use Ed25519 keys; they differ in what is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyVersion {
    /// Signs the raw message bytes.
    V0,
    /// Signs `SHA-256(message)`.
    V1,
}

impl KeyVersion {
    /// Version used for newly created keys.
    pub const CURRENT: KeyVersion = KeyVersion::V0;

    /// Wire tag written as the leading varint of every payload.
    pub fn tag(self) -> u64 {
        match self {
            KeyVersion::V0 => 0,
            KeyVersion::V1 => 1,
        }
    }

    /// Resolve a wire tag to a supported version.
    pub fn from_tag(tag: u64) -> Result<Self, DecodeError> {
        match tag {
            0 => Ok(KeyVersion::V0),
            1 => Ok(KeyVersion::V1),
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }
}

impl Default for KeyVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Whether an encoded key holds public or secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Public,
    Secret,
}

impl KeyKind {
    pub fn prefix(self) -> &'static str {
        match self {
            KeyKind::Public => "P",
            KeyKind::Secret => "S",
        }
    }
}

/// Result of [`decode_key`]. The body is wiped on drop whatever its kind.
pub struct DecodedKey {
    pub kind: KeyKind,
    pub version: KeyVersion,
    pub bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for DecodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedKey")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Encode a 32-byte key body as `P…` or `S…` text.
pub fn encode_key(bytes: &[u8; KEY_LEN], kind: KeyKind, version: KeyVersion) -> String {
    encode_check(kind.prefix(), version, bytes)
}

/// Decode `P…` / `S…` text back into its body, kind and version.
///
/// Never returns best-effort bytes: any prefix, alphabet, checksum, version
/// or length problem is an error.
pub fn decode_key(text: &str) -> Result<DecodedKey, DecodeError> {
    let text = text.trim();
    let kind = if text.starts_with(KeyKind::Public.prefix()) {
        KeyKind::Public
    } else if text.starts_with(KeyKind::Secret.prefix()) {
        KeyKind::Secret
    } else {
        return Err(DecodeError::BadPrefix);
    };

    let (version, body) = decode_check(text, kind.prefix())?;
    if body.len() != KEY_LEN {
        return Err(DecodeError::InvalidLength {
            expected: KEY_LEN,
            actual: body.len(),
        });
    }

    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    bytes.copy_from_slice(&body);
    Ok(DecodedKey {
        kind,
        version,
        bytes,
    })
}

// =============================================================================
// Addresses
// =============================================================================

/// A textual `AU…` address, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, ToSchema)]
#[schema(value_type = String)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Version tag embedded in the address payload.
    pub fn version(&self) -> KeyVersion {
        // Validated on construction, so the payload always decodes.
        decode_check(&self.0, ADDRESS_PREFIX)
            .map(|(version, _)| version)
            .unwrap_or(KeyVersion::CURRENT)
    }
}

/// Derive the address of a public key: `AU ‖ base58check(version ‖ SHA-256(pk))`.
pub fn derive_address(public_key: &[u8; KEY_LEN], version: KeyVersion) -> Address {
    let hash = Sha256::digest(public_key);
    Address(encode_check(ADDRESS_PREFIX, version, &hash))
}

impl FromStr for Address {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (_, body) = decode_check(s, ADDRESS_PREFIX)?;
        if body.len() != KEY_LEN {
            return Err(DecodeError::InvalidLength {
                expected: KEY_LEN,
                actual: body.len(),
            });
        }
        Ok(Address(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Base58check core
// =============================================================================

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

fn encode_check(prefix: &str, version: KeyVersion, body: &[u8]) -> String {
    let mut payload = Zeroizing::new(Vec::with_capacity(10 + body.len() + CHECKSUM_LEN));
    write_varint(&mut payload, version.tag());
    payload.extend_from_slice(body);
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);

    let mut text = String::with_capacity(prefix.len() + payload.len() * 2);
    text.push_str(prefix);
    text.push_str(&bs58::encode(payload.as_slice()).into_string());
    text
}

fn decode_check(text: &str, prefix: &str) -> Result<(KeyVersion, Zeroizing<Vec<u8>>), DecodeError> {
    let encoded = text.strip_prefix(prefix).ok_or(DecodeError::BadPrefix)?;
    let raw = Zeroizing::new(
        bs58::decode(encoded)
            .into_vec()
            .map_err(|e| DecodeError::InvalidBase58(e.to_string()))?,
    );

    if raw.len() <= CHECKSUM_LEN {
        return Err(DecodeError::Truncated);
    }
    let (payload, sum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(payload) != sum {
        return Err(DecodeError::ChecksumMismatch);
    }

    let (tag, consumed) = read_varint(payload)?;
    let version = KeyVersion::from_tag(tag)?;
    Ok((version, Zeroizing::new(payload[consumed..].to_vec())))
}

/// Unsigned LEB128.
fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(input: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    for (i, byte) in input.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // RFC 8032 test 1.
    const RFC_SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const RFC_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn hex32(s: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            out[i] = u8::from_str_radix(std::str::from_utf8(chunk).unwrap(), 16).unwrap();
        }
        out
    }

    /// Re-encode `text` after letting `mutate` touch the raw base58 payload.
    fn tamper(text: &str, prefix: &str, mutate: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut raw = bs58::decode(&text[prefix.len()..]).into_vec().unwrap();
        mutate(&mut raw);
        format!("{prefix}{}", bs58::encode(raw).into_string())
    }

    #[test]
    fn encodes_rfc8032_keys_to_fixtures() {
        let secret = hex32(RFC_SECRET);
        let public = hex32(RFC_PUBLIC);

        assert_eq!(
            encode_key(&secret, KeyKind::Secret, KeyVersion::V0),
            "S12CK6vgUFHBTWVA9bMakzaB94Fhjuhwi4K6zQWU7tU8nKPfuUHe"
        );
        assert_eq!(
            encode_key(&public, KeyKind::Public, KeyVersion::V0),
            "P12dqvheyJXzEYpywfm8g7TshzLbaXWTwHKQPkh4rYX3Db1zSMsn"
        );
        assert_eq!(
            encode_key(&public, KeyKind::Public, KeyVersion::V1),
            "P4ab6w719xfTgeZeaLkg4nUUuTDJBDJp4xUVzqkkYB3c5dLH2vG"
        );
    }

    #[test]
    fn derives_address_per_version() {
        let public = hex32(RFC_PUBLIC);
        let v0 = derive_address(&public, KeyVersion::V0);
        let v1 = derive_address(&public, KeyVersion::V1);

        assert_eq!(v0.as_str(), "AU1FyJeV7M5jsBexAqntUdrgTLHdxS8zrMvugqWj5aFFgP2MGdzS");
        assert_eq!(v1.as_str(), "AU3CiUsw9CWR6KUXskNWUbBHEFQFg5qqj9Zyo5fQyZuG4sfjgtBj");
        assert_eq!(v0.version(), KeyVersion::V0);
        assert_eq!(v1.version(), KeyVersion::V1);
        assert_eq!(derive_address(&public, KeyVersion::V0), v0);
    }

    #[test]
    fn decodes_both_versions() {
        let v0 = decode_key("S12CK6vgUFHBTWVA9bMakzaB94Fhjuhwi4K6zQWU7tU8nKPfuUHe").unwrap();
        assert_eq!(v0.kind, KeyKind::Secret);
        assert_eq!(v0.version, KeyVersion::V0);
        assert_eq!(*v0.bytes, hex32(RFC_SECRET));

        let v1 = decode_key("P4ab6w719xfTgeZeaLkg4nUUuTDJBDJp4xUVzqkkYB3c5dLH2vG").unwrap();
        assert_eq!(v1.kind, KeyKind::Public);
        assert_eq!(v1.version, KeyVersion::V1);
        assert_eq!(*v1.bytes, hex32(RFC_PUBLIC));
    }

    #[test]
    fn flipping_any_checksum_byte_is_detected() {
        let text = encode_key(&hex32(RFC_PUBLIC), KeyKind::Public, KeyVersion::V0);
        for offset in 1..=CHECKSUM_LEN {
            let bad = tamper(&text, "P", |raw| {
                let idx = raw.len() - offset;
                raw[idx] ^= 0x01;
            });
            assert_eq!(decode_key(&bad).unwrap_err(), DecodeError::ChecksumMismatch);
        }
    }

    #[test]
    fn rejects_unknown_prefix_and_alphabet() {
        assert_eq!(decode_key("X1abc").unwrap_err(), DecodeError::BadPrefix);
        assert_eq!(decode_key("").unwrap_err(), DecodeError::BadPrefix);
        assert!(matches!(
            decode_key("P0OIl").unwrap_err(),
            DecodeError::InvalidBase58(_)
        ));
        assert_eq!(decode_key("P1").unwrap_err(), DecodeError::Truncated);
    }

    #[test]
    fn rejects_unsupported_version_with_valid_checksum() {
        let mut payload = vec![7u8];
        payload.extend_from_slice(&[0xab; KEY_LEN]);
        let sum = checksum(&payload);
        payload.extend_from_slice(&sum);
        let text = format!("P{}", bs58::encode(payload).into_string());

        assert_eq!(
            decode_key(&text).unwrap_err(),
            DecodeError::UnsupportedVersion(7)
        );
    }

    #[test]
    fn rejects_wrong_body_length() {
        let text = encode_check("S", KeyVersion::V0, &[1u8; 31]);
        assert_eq!(
            decode_key(&text).unwrap_err(),
            DecodeError::InvalidLength {
                expected: KEY_LEN,
                actual: 31
            }
        );
    }

    #[test]
    fn address_parsing_validates() {
        let addr: Address = "AU1FyJeV7M5jsBexAqntUdrgTLHdxS8zrMvugqWj5aFFgP2MGdzS"
            .parse()
            .unwrap();
        assert_eq!(addr.version(), KeyVersion::V0);

        assert!("P12dqvheyJXzEYpywfm8g7TshzLbaXWTwHKQPkh4rYX3Db1zSMsn"
            .parse::<Address>()
            .is_err());
        let bad = tamper(addr.as_str(), ADDRESS_PREFIX, |raw| raw[5] ^= 0x80);
        assert_eq!(bad.parse::<Address>().unwrap_err(), DecodeError::ChecksumMismatch);
    }

    #[test]
    fn address_serde_is_a_plain_string() {
        let addr = derive_address(&hex32(RFC_PUBLIC), KeyVersion::V0);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"AUnope\"").is_err());
    }

    #[test]
    fn varint_handles_multi_byte_tags() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xac, 0x02]);
        assert_eq!(read_varint(&buf).unwrap(), (300, 2));
        assert_eq!(read_varint(&[0x80]).unwrap_err(), DecodeError::Truncated);
    }

    fn kind_strategy() -> impl Strategy<Value = KeyKind> {
        prop_oneof![Just(KeyKind::Public), Just(KeyKind::Secret)]
    }

    fn version_strategy() -> impl Strategy<Value = KeyVersion> {
        prop_oneof![Just(KeyVersion::V0), Just(KeyVersion::V1)]
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(
            bytes in proptest::array::uniform32(any::<u8>()),
            kind in kind_strategy(),
            version in version_strategy(),
        ) {
            let decoded = decode_key(&encode_key(&bytes, kind, version)).unwrap();
            prop_assert_eq!(*decoded.bytes, bytes);
            prop_assert_eq!(decoded.kind, kind);
            prop_assert_eq!(decoded.version, version);
        }
    }
}
