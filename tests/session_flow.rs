// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flow over the file-backed vault: onboarding, import, derive,
//! sign, restart, and clear.

use relational_key_vault::config::VaultConfig;
use relational_key_vault::error::WalletError;
use relational_key_vault::models::WalletKind;
use relational_key_vault::session::{ExportedSecret, WalletSession};
use relational_key_vault::storage::{AuditEventType, AuditRepository, StoragePaths};
use tempfile::TempDir;

fn abandon_art() -> Vec<String> {
    let mut words = vec!["abandon".to_string(); 23];
    words.push("art".to_string());
    words
}

fn config(dir: &TempDir) -> VaultConfig {
    VaultConfig {
        data_dir: dir.path().to_path_buf(),
        ..VaultConfig::default()
    }
}

#[tokio::test]
async fn wallet_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let (alias, address) = {
        let session = WalletSession::open(&config).unwrap();
        assert!(!session.has_wallet().await.unwrap());

        let profile = session
            .import_from_mnemonic(abandon_art(), Some("main".into()))
            .await
            .unwrap();
        assert_eq!(profile.kind, WalletKind::Mnemonic);
        session.set_pin(None, "2468".into()).await.unwrap();
        session.complete_onboarding().await.unwrap();
        (profile.alias, profile.address)
    };

    // Master key and database both reload from disk.
    let session = WalletSession::open(&config).unwrap();
    assert!(session.has_wallet().await.unwrap());
    assert!(session.onboarding_completed().await.unwrap());
    assert_eq!(
        session.active_wallet().await.unwrap().map(|p| p.address),
        Some(address.clone())
    );

    let signature = session
        .sign(alias.clone(), b"payload".to_vec())
        .await
        .unwrap();
    let profile = session.get_wallet(alias.clone()).await.unwrap();
    assert!(session
        .verify(profile.public_key, b"payload".to_vec(), signature.to_bytes().to_vec())
        .await
        .unwrap());

    let exported = session.export_secret(alias, "2468".into()).await.unwrap();
    assert!(matches!(exported, ExportedSecret::Mnemonic(_)));
    assert_eq!(exported.expose(), abandon_art().join(" "));
}

#[tokio::test]
async fn derived_accounts_and_switching() {
    let dir = TempDir::new().unwrap();
    let session = WalletSession::open(&config(&dir)).unwrap();

    let main = session.import_from_mnemonic(abandon_art(), None).await.unwrap();
    let second = session
        .derive_account(main.alias.clone(), 1, Some("second".into()))
        .await
        .unwrap();
    assert_ne!(main.address, second.address);
    assert_eq!(
        second.derivation_path.as_deref(),
        Some("m/44'/297'/0'/0'/1'")
    );

    assert_eq!(session.list_wallets().await.unwrap().len(), 2);
    session.set_active_wallet(second.address.clone()).await.unwrap();
    assert_eq!(
        session.active_wallet().await.unwrap().map(|p| p.alias),
        Some(second.alias)
    );
}

#[tokio::test]
async fn clear_then_reimport() {
    let dir = TempDir::new().unwrap();
    let session = WalletSession::open(&config(&dir)).unwrap();

    let created = session.create_wallet(None).await.unwrap();
    assert!(session.has_wallet().await.unwrap());

    session.clear().await.unwrap();
    assert!(!session.has_wallet().await.unwrap());
    assert!(matches!(
        session.sign(created.alias, b"x".to_vec()).await,
        Err(WalletError::NotFound(_))
    ));

    session
        .import_from_raw_secret_key(
            "S12CK6vgUFHBTWVA9bMakzaB94Fhjuhwi4K6zQWU7tU8nKPfuUHe".into(),
            Some("P12dqvheyJXzEYpywfm8g7TshzLbaXWTwHKQPkh4rYX3Db1zSMsn".into()),
            None,
        )
        .await
        .unwrap();
    assert!(session.has_wallet().await.unwrap());

    let audit = AuditRepository::new(StoragePaths::new(dir.path()));
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let types: Vec<_> = audit
        .read_events(&today)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&AuditEventType::WalletCreated));
    assert!(types.contains(&AuditEventType::StoreCleared));
    assert!(types.contains(&AuditEventType::WalletImported));
}
