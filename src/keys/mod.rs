// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Management
//!
//! Everything that turns entropy into a usable signing identity:
//!
//! - [`mnemonic`] - 24-word BIP-39 recovery phrases and seed stretching
//! - [`derivation`] - SLIP-0010 Ed25519 derivation and raw key import
//! - [`codec`] - versioned base58check text for keys and addresses
//!
//! Nothing in this module performs I/O. Secret material is held in
//! zeroizing buffers and dropped as soon as the caller is done with it.

pub mod codec;
pub mod derivation;
pub mod mnemonic;

pub use codec::{
    decode_key, derive_address, encode_key, Address, DecodeError, DecodedKey, KeyKind, KeyVersion,
    KEY_LEN,
};
pub use derivation::{DerivationPath, KeyPair, Signature};
pub use mnemonic::{Mnemonic, Seed};

/// Why a mnemonic was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MnemonicError {
    #[error("expected 24 words, got {0}")]
    WordCount(usize),

    #[error("word {position} is not in the wordlist")]
    UnknownWord { position: usize },

    #[error("checksum does not match")]
    Checksum,
}

/// Errors from the mnemonic engine and key derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] MnemonicError),

    #[error("invalid key: {0}")]
    Decode(#[from] DecodeError),

    #[error("derived public key does not match the supplied public key")]
    KeyMismatch,

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("secure random source unavailable")]
    EntropySourceUnavailable,

    #[error("invalid signature encoding")]
    InvalidSignature,
}
