// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secure wallet store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! One table, `entries`: name → bytes.
//!
//! | Entry                   | Value                                  |
//! |-------------------------|----------------------------------------|
//! | `mnemonic_<alias>`      | sealed blob (JSON)                     |
//! | `private_key_<alias>`   | sealed blob (JSON)                     |
//! | `public_key_<alias>`    | encoded public key, plaintext          |
//! | `profile_<alias>`       | [`WalletProfile`] JSON, plaintext      |
//! | `active_wallet`         | address of the active wallet           |
//! | `user_pin`              | Argon2 PHC verifier                    |
//! | `biometric_enabled`     | one byte, 0 or 1                       |
//! | `onboarding_completed`  | one byte, 0 or 1                       |
//! | `private_key`           | legacy un-aliased sealed key           |
//!
//! Secrets are sealed by the [`EnvelopeService`] before they reach a write
//! transaction. The database sits behind a `RwLock`: mutations take the write
//! lock, reads share the read lock, so a reader never sees a half-written
//! wallet.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use redb::{Database, ReadableDatabase, TableDefinition};
use zeroize::Zeroizing;

use crate::envelope::{EncryptedBlob, EnvelopeError, EnvelopeService};
use crate::keys::Address;
use crate::models::WalletProfile;

// =============================================================================
// Table Definitions
// =============================================================================

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// Entry names inside the `entries` table.
pub mod entry {
    pub const ACTIVE_WALLET: &str = "active_wallet";
    pub const USER_PIN: &str = "user_pin";
    pub const BIOMETRIC_ENABLED: &str = "biometric_enabled";
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
    pub const LEGACY_PRIVATE_KEY: &str = "private_key";

    pub(super) const PROFILE_PREFIX: &str = "profile_";
    // '`' sorts directly after '_', bounding the profile range scan.
    pub(super) const PROFILE_END: &str = "profile`";

    pub fn public_key(alias: &str) -> String {
        format!("public_key_{alias}")
    }

    pub fn profile(alias: &str) -> String {
        format!("{PROFILE_PREFIX}{alias}")
    }
}

/// Kind of sealed secret stored per alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Mnemonic,
    SecretKey,
}

impl SecretKind {
    pub fn entry(self, alias: &str) -> String {
        match self {
            SecretKind::Mnemonic => format!("mnemonic_{alias}"),
            SecretKind::SecretKey => format!("private_key_{alias}"),
        }
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("corrupt entry {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything written when a wallet is created or imported.
pub struct NewWallet {
    pub profile: WalletProfile,
    pub kind: SecretKind,
    pub secret: Zeroizing<Vec<u8>>,
    /// Point `active_wallet` at this wallet in the same transaction.
    pub activate: bool,
}

// =============================================================================
// SecureWalletStore
// =============================================================================

pub struct SecureWalletStore {
    db: RwLock<Database>,
    envelope: EnvelopeService,
}

impl SecureWalletStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path, envelope: EnvelopeService) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so read transactions never fail on a fresh file
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: RwLock::new(db),
            envelope,
        })
    }

    pub fn envelope(&self) -> &EnvelopeService {
        &self.envelope
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Database>> {
        self.db.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Database>> {
        self.db.write().map_err(|_| StoreError::LockPoisoned)
    }

    // =========================================================================
    // Raw entries
    // =========================================================================

    fn get_raw(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let db = self.read()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        Ok(table.get(name)?.map(|v| v.value().to_vec()))
    }

    fn put_raw(&self, name: &str, value: &[u8]) -> StoreResult<()> {
        let db = self.write()?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.insert(name, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_string(&self, name: &str) -> StoreResult<Option<String>> {
        self.get_raw(name)?
            .map(|bytes| String::from_utf8(bytes).map_err(|_| StoreError::Corrupt(name.into())))
            .transpose()
    }

    // =========================================================================
    // Sealed secrets
    // =========================================================================

    /// Seal `plaintext` and store it under `<kind>_<alias>`. Last write wins.
    pub fn put(&self, alias: &str, kind: SecretKind, plaintext: Zeroizing<Vec<u8>>) -> StoreResult<()> {
        let blob = self.envelope.seal(plaintext)?;
        self.put_raw(&kind.entry(alias), &blob.to_bytes()?)
    }

    /// The sealed blob, or `None` if nothing is stored.
    pub fn get(&self, alias: &str, kind: SecretKind) -> StoreResult<Option<EncryptedBlob>> {
        let name = kind.entry(alias);
        self.get_raw(&name)?
            .map(|bytes| EncryptedBlob::from_bytes(&bytes).map_err(|_| StoreError::Corrupt(name)))
            .transpose()
    }

    /// Open the stored secret. Fails closed on any envelope error.
    pub fn reveal(&self, alias: &str, kind: SecretKind) -> StoreResult<Option<Zeroizing<Vec<u8>>>> {
        match self.get(alias, kind)? {
            Some(blob) => Ok(Some(self.envelope.open(&blob)?)),
            None => Ok(None),
        }
    }

    /// Store a sealed secret under the legacy un-aliased `private_key` entry.
    pub fn put_legacy_private_key(&self, plaintext: Zeroizing<Vec<u8>>) -> StoreResult<()> {
        let blob = self.envelope.seal(plaintext)?;
        self.put_raw(entry::LEGACY_PRIVATE_KEY, &blob.to_bytes()?)
    }

    pub fn public_key(&self, alias: &str) -> StoreResult<Option<String>> {
        self.get_string(&entry::public_key(alias))
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    /// Write a wallet's sealed secret, public key, profile and (optionally)
    /// the active pointer in one transaction.
    pub fn insert_wallet(&self, wallet: NewWallet) -> StoreResult<()> {
        let NewWallet {
            profile,
            kind,
            secret,
            activate,
        } = wallet;
        let alias = profile.alias.as_str();

        let blob = self.envelope.seal(secret)?.to_bytes()?;
        let profile_json = serde_json::to_vec(&profile)?;

        let db = self.write()?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.insert(kind.entry(alias).as_str(), blob.as_slice())?;
            table.insert(
                entry::public_key(alias).as_str(),
                profile.public_key.as_bytes(),
            )?;
            table.insert(entry::profile(alias).as_str(), profile_json.as_slice())?;
            if activate {
                table.insert(entry::ACTIVE_WALLET, profile.address.as_str().as_bytes())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn profile(&self, alias: &str) -> StoreResult<Option<WalletProfile>> {
        match self.get_raw(&entry::profile(alias))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All wallet profiles, ordered by creation time.
    pub fn profiles(&self) -> StoreResult<Vec<WalletProfile>> {
        let db = self.read()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;

        let mut profiles = Vec::new();
        for item in table.range(entry::PROFILE_PREFIX..entry::PROFILE_END)? {
            let (_, value) = item?;
            profiles.push(serde_json::from_slice::<WalletProfile>(value.value())?);
        }
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(profiles)
    }

    pub fn profile_by_address(&self, address: &Address) -> StoreResult<Option<WalletProfile>> {
        Ok(self
            .profiles()?
            .into_iter()
            .find(|p| &p.address == address))
    }

    // =========================================================================
    // Active wallet
    // =========================================================================

    pub fn set_active_wallet(&self, address: &Address) -> StoreResult<()> {
        self.put_raw(entry::ACTIVE_WALLET, address.as_str().as_bytes())
    }

    pub fn active_wallet(&self) -> StoreResult<Option<Address>> {
        self.get_string(entry::ACTIVE_WALLET)?
            .map(|text| {
                text.parse()
                    .map_err(|_| StoreError::Corrupt(entry::ACTIVE_WALLET.into()))
            })
            .transpose()
    }

    /// True iff an active pointer exists and backing key material is present:
    /// a mnemonic or secret-key blob for the active alias, or the legacy
    /// un-aliased private key.
    pub fn has_wallet(&self) -> StoreResult<bool> {
        let db = self.read()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;

        let Some(active) = table.get(entry::ACTIVE_WALLET)? else {
            return Ok(false);
        };
        let active = active.value().to_vec();

        if table.get(entry::LEGACY_PRIVATE_KEY)?.is_some() {
            return Ok(true);
        }

        for item in table.range(entry::PROFILE_PREFIX..entry::PROFILE_END)? {
            let (_, value) = item?;
            let profile: WalletProfile = serde_json::from_slice(value.value())?;
            if profile.address.as_str().as_bytes() != active.as_slice() {
                continue;
            }
            let alias = profile.alias.as_str();
            let has_mnemonic = table.get(SecretKind::Mnemonic.entry(alias).as_str())?.is_some();
            let has_secret = table.get(SecretKind::SecretKey.entry(alias).as_str())?.is_some();
            return Ok(has_mnemonic || has_secret);
        }

        Ok(false)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn set_flag(&self, name: &str, value: bool) -> StoreResult<()> {
        self.put_raw(name, &[u8::from(value)])
    }

    pub fn flag(&self, name: &str) -> StoreResult<bool> {
        Ok(matches!(self.get_raw(name)?.as_deref(), Some([1])))
    }

    pub fn set_pin_verifier(&self, verifier: &str) -> StoreResult<()> {
        self.put_raw(entry::USER_PIN, verifier.as_bytes())
    }

    pub fn pin_verifier(&self) -> StoreResult<Option<String>> {
        self.get_string(entry::USER_PIN)
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Erase every entry. Irreversible.
    pub fn clear(&self) -> StoreResult<()> {
        let db = self.write()?;
        let write_txn = db.begin_write()?;
        write_txn.delete_table(ENTRIES)?;
        {
            let _ = write_txn.open_table(ENTRIES)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
