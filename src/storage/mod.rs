// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state for the vault. Wallet entries live in a single redb
//! database; secrets are sealed by the envelope layer before they are written,
//! so the database file alone never reveals key material.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   vault.redb              # Wallet entries, flags and PIN verifier
//!   keys/
//!     master.json           # Envelope master key (file-backed key store)
//!   audit/
//!     {date}/events.jsonl   # Daily audit logs
//! ```
//!
//! ## Important Notes
//!
//! - Public keys, addresses and profiles are stored in the clear
//! - Mnemonics and secret keys are only ever written as sealed blobs
//! - Audit events never carry secret material

pub mod audit;
pub mod paths;
pub mod wallet_store;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditRepository};
pub use paths::StoragePaths;
pub use wallet_store::{
    entry, NewWallet, SecretKind, SecureWalletStore, StoreError, StoreResult,
};
