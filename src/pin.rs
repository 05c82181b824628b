// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PIN verifier hashing (Argon2id, PHC string format).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;

pub const MIN_PIN_LEN: usize = 4;
pub const MAX_PIN_LEN: usize = 12;

const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    #[error("PIN must be {MIN_PIN_LEN}-{MAX_PIN_LEN} digits")]
    InvalidFormat,

    #[error("secure random source unavailable")]
    EntropySourceUnavailable,

    #[error("PIN hashing failed: {0}")]
    Hash(String),

    #[error("stored PIN verifier is malformed")]
    MalformedVerifier,
}

/// Check the PIN shape: ASCII digits only, 4 to 12 of them.
pub fn validate_format(pin: &str) -> Result<(), PinError> {
    let ok = (MIN_PIN_LEN..=MAX_PIN_LEN).contains(&pin.len())
        && pin.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(PinError::InvalidFormat)
    }
}

/// Hash a PIN into a PHC verifier string with a fresh random salt.
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    validate_format(pin)?;

    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|_| PinError::EntropySourceUnavailable)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PinError::Hash(e.to_string()))?;

    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PinError::Hash(e.to_string()))
}

/// Constant-time check of `pin` against a stored verifier.
pub fn verify_pin(pin: &str, verifier: &str) -> Result<bool, PinError> {
    let parsed = PasswordHash::new(verifier).map_err(|_| PinError::MalformedVerifier)?;
    Ok(Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok())
}
