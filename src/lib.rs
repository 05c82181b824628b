// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Key Vault - Self-Custodial Wallet Key Management
//!
//! Generates and restores BIP-39 recovery phrases, derives Ed25519 accounts
//! along hardened SLIP-0010 paths, renders versioned public/secret keys and
//! addresses, and keeps every secret sealed under an envelope master key.
//!
//! ## Modules
//!
//! - `keys` - Mnemonic, derivation, signing and key/address codec
//! - `envelope` - AEAD sealing under a provider-held master key
//! - `storage` - redb wallet store, storage paths and audit log
//! - `session` - The wallet session facade
//! - `auth` - Per-install bearer token for the HTTP API
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod models;
pub mod pin;
pub mod session;
pub mod state;
pub mod storage;
