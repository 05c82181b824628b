// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! 24-word BIP-39 recovery phrases.
//!
//! Generation draws 256 bits from the OS RNG; the wordlist, checksum and
//! PBKDF2-HMAC-SHA512 stretching come from `tiny-bip39`. User input is
//! trimmed, lowercased and NFKD-normalized before any lookup.

use std::fmt;

use bip39::Language;
use rand::rngs::OsRng;
use rand::RngCore;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{KeyError, MnemonicError};

/// Number of words in every phrase this wallet accepts.
pub const WORD_COUNT: usize = 24;

/// Byte length of a stretched seed.
pub const SEED_LEN: usize = 64;

const ENTROPY_LEN: usize = 32;

/// A validated 24-word recovery phrase.
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// Generate a fresh phrase from 256 bits of OS entropy.
    pub fn generate() -> Result<Self, KeyError> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        OsRng
            .try_fill_bytes(&mut entropy[..])
            .map_err(|_| KeyError::EntropySourceUnavailable)?;

        // 32 bytes is always a valid BIP-39 entropy length.
        let inner = bip39::Mnemonic::from_entropy(&entropy[..], Language::English)
            .map_err(|_| KeyError::EntropySourceUnavailable)?;

        Ok(Self { inner })
    }

    /// Validate a sequence of words.
    ///
    /// Rejects a wrong word count, words outside the English list and a bad
    /// checksum, in that order.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self, KeyError> {
        if words.len() != WORD_COUNT {
            return Err(MnemonicError::WordCount(words.len()).into());
        }

        let normalized: Vec<Zeroizing<String>> =
            words.iter().map(|w| normalize_word(w.as_ref())).collect();

        let wordmap = Language::English.wordmap();
        if let Some(position) = normalized
            .iter()
            .position(|w| wordmap.get_bits(w).is_err())
        {
            return Err(MnemonicError::UnknownWord { position }.into());
        }

        let phrase = Zeroizing::new(
            normalized
                .iter()
                .map(|w| w.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );

        let inner = bip39::Mnemonic::from_phrase(&phrase, Language::English)
            .map_err(|_| KeyError::from(MnemonicError::Checksum))?;

        Ok(Self { inner })
    }

    /// Validate a single whitespace-separated phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, KeyError> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        Self::from_words(&words)
    }

    pub fn phrase(&self) -> &str {
        self.inner.phrase()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.inner.phrase().split(' ')
    }

    /// Stretch the phrase into a 64-byte seed.
    ///
    /// Deterministic: the same phrase and passphrase always give the same
    /// seed, which is what makes recovery possible.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        let stretched = bip39::Seed::new(&self.inner, passphrase);
        let mut out = [0u8; SEED_LEN];
        out.copy_from_slice(stretched.as_bytes());
        Seed(out)
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

/// Validate words and stretch them with an empty passphrase.
pub fn validate<S: AsRef<str>>(words: &[S]) -> Result<Seed, KeyError> {
    Ok(Mnemonic::from_words(words)?.to_seed(""))
}

fn normalize_word(word: &str) -> Zeroizing<String> {
    let lowered = Zeroizing::new(word.trim().to_lowercase());
    Zeroizing::new(lowered.nfkd().collect())
}

/// Stretched seed bytes. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Wrap seed bytes supplied directly (seed-import flows and tests).
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}
