// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk vault layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent vault data.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities for the vault data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all vault data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Wallet Store ==========

    /// The redb database holding sealed secrets, profiles and settings.
    pub fn database(&self) -> PathBuf {
        self.root.join("vault.redb")
    }

    // ========== Master Keys ==========

    /// Directory for software key-store material.
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Master key file used by the file-backed key store.
    pub fn master_key_file(&self) -> PathBuf {
        self.keys_dir().join("master.json")
    }

    // ========== API Access ==========

    /// Bearer token required on every `/v1` request.
    pub fn api_token_file(&self) -> PathBuf {
        self.root.join("api_token")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
