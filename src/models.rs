// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Data Models
//!
//! Plaintext metadata persisted next to the sealed secrets and returned by the
//! API. Nothing in this module holds secret material.
//!
//! ## Model Categories
//!
//! - **Wallet profiles**: one per managed wallet, keyed by alias
//! - **Settings**: biometric, onboarding and PIN state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::keys::{Address, KeyVersion};

/// Namespace for wallet aliases (UUIDv5 over the address).
const ALIAS_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_4f5e_8d2a_4c47_9a0e_52d1_7c3b_9e08);

/// Stable storage alias for a wallet address.
///
/// Re-importing the same key lands on the same alias.
pub fn wallet_alias(address: &Address) -> String {
    Uuid::new_v5(&ALIAS_NAMESPACE, address.as_str().as_bytes()).to_string()
}

// =============================================================================
// Wallet Profiles
// =============================================================================

/// Where a wallet's signing key comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Derived from a stored mnemonic.
    Mnemonic,
    /// Externally generated secret key imported as-is.
    ImportedKey,
}

/// Metadata for one managed wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct WalletProfile {
    /// Storage alias, unique within the vault.
    pub alias: String,
    /// Wallet address (`AU...`).
    pub address: Address,
    /// Optional user-facing label.
    pub label: Option<String>,
    /// Account index (last path segment); 0 for imported keys.
    pub derivation_index: u32,
    /// Full derivation path for mnemonic wallets.
    pub derivation_path: Option<String>,
    pub kind: WalletKind,
    /// Key version the wallet encodes and signs under.
    pub version: KeyVersion,
    /// Encoded public key (`P...`).
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settings
// =============================================================================

/// Non-secret vault settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VaultSettings {
    pub biometric_enabled: bool,
    pub onboarding_completed: bool,
    /// Whether a PIN verifier is stored. The verifier itself is never exposed.
    pub pin_set: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_address;

    #[test]
    fn alias_is_deterministic_per_address() {
        let a = derive_address(&[1u8; 32], KeyVersion::V0);
        let b = derive_address(&[2u8; 32], KeyVersion::V0);
        assert_eq!(wallet_alias(&a), wallet_alias(&a));
        assert_ne!(wallet_alias(&a), wallet_alias(&b));
        assert!(Uuid::parse_str(&wallet_alias(&a)).is_ok());
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&WalletKind::ImportedKey).unwrap(),
            "\"imported_key\""
        );
    }
}
