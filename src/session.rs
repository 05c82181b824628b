// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Session
//!
//! The only surface the rest of the application talks to. It wires the
//! mnemonic engine, derivation, codec, envelope and store together:
//!
//! ```text
//! Mnemonic -> Seed -> KeyPair -> Address / encoded keys
//!                        |
//!                 secret bytes -> EnvelopeService -> SecureWalletStore
//! ```
//!
//! [`VaultCore`] holds the synchronous implementation. [`WalletSession`]
//! wraps it and runs every call on the blocking pool so key stretching,
//! sealing and redb I/O never stall the async runtime.
//!
//! Decrypted secrets live only inside a single call, in zeroizing buffers,
//! and are never logged.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::envelope::{EnvelopeService, FileKeyStore, KeyStoreProvider};
use crate::error::WalletError;
use crate::keys::derivation::{self, signature_from_slice};
use crate::keys::{
    decode_key, Address, DecodeError, DerivationPath, KeyKind, KeyPair, Mnemonic, Signature,
    KEY_LEN,
};
use crate::models::{wallet_alias, VaultSettings, WalletKind, WalletProfile};
use crate::pin;
use crate::storage::{
    entry, AuditEvent, AuditEventType, AuditRepository, NewWallet, SecretKind, SecureWalletStore,
    StoragePaths,
};

pub type WalletResult<T> = Result<T, WalletError>;

/// Secret returned by a PIN-gated backup export.
pub enum ExportedSecret {
    Mnemonic(Zeroizing<String>),
    SecretKey(Zeroizing<String>),
}

impl ExportedSecret {
    pub fn expose(&self) -> &str {
        match self {
            ExportedSecret::Mnemonic(text) | ExportedSecret::SecretKey(text) => text,
        }
    }
}

impl std::fmt::Debug for ExportedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ExportedSecret::Mnemonic(_) => "Mnemonic",
            ExportedSecret::SecretKey(_) => "SecretKey",
        };
        write!(f, "ExportedSecret::{kind}(<redacted>)")
    }
}

// =============================================================================
// VaultCore (synchronous)
// =============================================================================

pub struct VaultCore {
    store: SecureWalletStore,
    audit: AuditRepository,
    coin_type: u32,
}

impl VaultCore {
    pub fn new(store: SecureWalletStore, audit: AuditRepository, coin_type: u32) -> Self {
        Self {
            store,
            audit,
            coin_type,
        }
    }

    /// Open the vault under `data_dir` with an injected key-store provider.
    pub fn open(
        data_dir: &Path,
        provider: Arc<dyn KeyStoreProvider>,
        master_key_alias: &str,
        coin_type: u32,
    ) -> WalletResult<Self> {
        let paths = StoragePaths::new(data_dir);
        let envelope = EnvelopeService::new(provider, master_key_alias)?;
        let store = SecureWalletStore::open(&paths.database(), envelope)?;
        Ok(Self::new(store, AuditRepository::new(paths), coin_type))
    }

    pub fn store(&self) -> &SecureWalletStore {
        &self.store
    }

    pub fn audit(&self) -> &AuditRepository {
        &self.audit
    }

    // =========================================================================
    // Create / import
    // =========================================================================

    pub fn create_wallet(&self, label: Option<String>) -> WalletResult<WalletProfile> {
        let mnemonic = Mnemonic::generate()?;
        let profile = self.store_mnemonic_wallet(&mnemonic, label)?;

        info!(alias = %profile.alias, address = %profile.address, "Wallet created");
        self.audit.record(
            AuditEvent::new(AuditEventType::WalletCreated)
                .with_wallet(&profile.alias)
                .with_details(serde_json::json!({ "kind": "mnemonic" })),
        );
        Ok(profile)
    }

    pub fn import_from_mnemonic<S: AsRef<str>>(
        &self,
        words: &[S],
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let mnemonic = Mnemonic::from_words(words)?;
        let profile = self.store_mnemonic_wallet(&mnemonic, label)?;

        info!(alias = %profile.alias, address = %profile.address, "Wallet imported from mnemonic");
        self.audit.record(
            AuditEvent::new(AuditEventType::WalletImported)
                .with_wallet(&profile.alias)
                .with_details(serde_json::json!({ "kind": "mnemonic" })),
        );
        Ok(profile)
    }

    /// Import an encoded secret key (`S...`), optionally cross-checked
    /// against the public key (`P...`) the user expects it to produce.
    pub fn import_from_raw_secret_key(
        &self,
        encoded_secret_key: &str,
        expected_public_key: Option<&str>,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let secret = decode_key(encoded_secret_key.trim())?;
        if secret.kind != KeyKind::Secret {
            return Err(DecodeError::BadPrefix.into());
        }

        let expected = match expected_public_key {
            Some(text) => {
                let public = decode_key(text.trim())?;
                if public.kind != KeyKind::Public {
                    return Err(DecodeError::BadPrefix.into());
                }
                if public.version != secret.version {
                    return Err(WalletError::KeyMismatch);
                }
                Some(*public.bytes)
            }
            None => None,
        };

        let pair = KeyPair::import_verified(&secret.bytes, secret.version, expected.as_ref())?;
        let address = pair.address();
        let profile = WalletProfile {
            alias: wallet_alias(&address),
            address,
            label,
            derivation_index: 0,
            derivation_path: None,
            kind: WalletKind::ImportedKey,
            version: pair.version(),
            public_key: pair.encoded_public_key(),
            created_at: Utc::now(),
        };

        self.store.insert_wallet(NewWallet {
            profile: profile.clone(),
            kind: SecretKind::SecretKey,
            secret: Zeroizing::new(pair.secret_bytes().to_vec()),
            activate: true,
        })?;

        info!(
            alias = %profile.alias,
            address = %profile.address,
            version = ?profile.version,
            "Wallet imported from secret key"
        );
        self.audit.record(
            AuditEvent::new(AuditEventType::WalletImported)
                .with_wallet(&profile.alias)
                .with_details(serde_json::json!({
                    "kind": "imported_key",
                    "cross_checked": expected_public_key.is_some(),
                })),
        );
        Ok(profile)
    }

    /// Derive another account from a mnemonic wallet's phrase. An index
    /// whose account is already managed returns the stored profile as is.
    pub fn derive_account(
        &self,
        source_alias: &str,
        index: u32,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let source = self.get_wallet(source_alias)?;
        if source.kind != WalletKind::Mnemonic {
            return Err(WalletError::NotFound(format!(
                "mnemonic for wallet {source_alias}"
            )));
        }

        let mnemonic = self.load_mnemonic(source_alias)?;
        let profile = self.mnemonic_profile(&mnemonic, index, label)?;
        if let Some(existing) = self.store.profile(&profile.alias)? {
            debug!(alias = %existing.alias, index, "Account already managed");
            return Ok(existing);
        }

        self.store.insert_wallet(NewWallet {
            profile: profile.clone(),
            kind: SecretKind::Mnemonic,
            secret: Zeroizing::new(mnemonic.phrase().as_bytes().to_vec()),
            activate: false,
        })?;

        info!(
            source = %source_alias,
            alias = %profile.alias,
            index,
            "Account derived"
        );
        self.audit.record(
            AuditEvent::new(AuditEventType::AccountDerived)
                .with_wallet(&profile.alias)
                .with_details(serde_json::json!({
                    "source_alias": source_alias,
                    "derivation_index": index,
                })),
        );
        Ok(profile)
    }

    fn mnemonic_profile(
        &self,
        mnemonic: &Mnemonic,
        index: u32,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let path = DerivationPath::account(self.coin_type, index)?;
        let pair = KeyPair::derive(&mnemonic.to_seed(""), &path)?;
        let address = pair.address();

        Ok(WalletProfile {
            alias: wallet_alias(&address),
            address,
            label,
            derivation_index: index,
            derivation_path: Some(path.to_string()),
            kind: WalletKind::Mnemonic,
            version: pair.version(),
            public_key: pair.encoded_public_key(),
            created_at: Utc::now(),
        })
    }

    /// Store account 0 of `mnemonic` and make it the active wallet.
    fn store_mnemonic_wallet(
        &self,
        mnemonic: &Mnemonic,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let profile = self.mnemonic_profile(mnemonic, 0, label)?;
        self.store.insert_wallet(NewWallet {
            profile: profile.clone(),
            kind: SecretKind::Mnemonic,
            secret: Zeroizing::new(mnemonic.phrase().as_bytes().to_vec()),
            activate: true,
        })?;
        Ok(profile)
    }

    // =========================================================================
    // Lookup / selection
    // =========================================================================

    pub fn list_wallets(&self) -> WalletResult<Vec<WalletProfile>> {
        Ok(self.store.profiles()?)
    }

    pub fn get_wallet(&self, alias: &str) -> WalletResult<WalletProfile> {
        self.store
            .profile(alias)?
            .ok_or_else(|| WalletError::NotFound(format!("wallet {alias}")))
    }

    /// The active wallet's profile, if the pointer names a managed wallet.
    pub fn active_wallet(&self) -> WalletResult<Option<WalletProfile>> {
        match self.store.active_wallet()? {
            Some(address) => Ok(self.store.profile_by_address(&address)?),
            None => Ok(None),
        }
    }

    pub fn set_active_wallet(&self, address: &Address) -> WalletResult<WalletProfile> {
        let profile = self
            .store
            .profile_by_address(address)?
            .ok_or_else(|| WalletError::NotFound(format!("wallet with address {address}")))?;
        self.store.set_active_wallet(address)?;

        info!(alias = %profile.alias, "Active wallet changed");
        self.audit
            .record(AuditEvent::new(AuditEventType::ActiveWalletChanged).with_wallet(&profile.alias));
        Ok(profile)
    }

    pub fn has_wallet(&self) -> WalletResult<bool> {
        Ok(self.store.has_wallet()?)
    }

    // =========================================================================
    // Signing
    // =========================================================================

    /// Sign `message` with the wallet's key. The key is rebuilt from the
    /// sealed blob for this call only.
    pub fn sign(&self, alias: &str, message: &[u8]) -> WalletResult<Signature> {
        let profile = self.get_wallet(alias)?;
        let pair = self.load_key_pair(&profile)?;
        let signature = pair.sign(message);
        drop(pair);

        debug!(alias = %alias, len = message.len(), "Message signed");
        self.audit.record(
            AuditEvent::new(AuditEventType::MessageSigned)
                .with_wallet(alias)
                .with_details(serde_json::json!({ "message_len": message.len() })),
        );
        Ok(signature)
    }

    /// Verify a signature against an encoded public key (`P...`).
    pub fn verify(&self, public_key: &str, message: &[u8], signature: &[u8]) -> WalletResult<bool> {
        let decoded = decode_key(public_key.trim())?;
        if decoded.kind != KeyKind::Public {
            return Err(DecodeError::BadPrefix.into());
        }
        let signature = signature_from_slice(signature)?;
        Ok(derivation::verify(
            &decoded.bytes,
            decoded.version,
            message,
            &signature,
        ))
    }

    fn load_mnemonic(&self, alias: &str) -> WalletResult<Mnemonic> {
        let phrase = self
            .store
            .reveal(alias, SecretKind::Mnemonic)?
            .ok_or_else(|| WalletError::NotFound(format!("mnemonic for wallet {alias}")))?;
        let text = std::str::from_utf8(&phrase).map_err(|_| WalletError::DecryptionFailure)?;
        Mnemonic::from_phrase(text).map_err(|_| WalletError::DecryptionFailure)
    }

    fn load_key_pair(&self, profile: &WalletProfile) -> WalletResult<KeyPair> {
        let pair = match profile.kind {
            WalletKind::Mnemonic => {
                let mnemonic = self.load_mnemonic(&profile.alias)?;
                let path = match &profile.derivation_path {
                    Some(text) => text.parse::<DerivationPath>()?,
                    None => DerivationPath::account(self.coin_type, profile.derivation_index)?,
                };
                KeyPair::derive(&mnemonic.to_seed(""), &path)?
            }
            WalletKind::ImportedKey => {
                let raw = self
                    .store
                    .reveal(&profile.alias, SecretKind::SecretKey)?
                    .ok_or_else(|| {
                        WalletError::NotFound(format!("secret key for wallet {}", profile.alias))
                    })?;
                let secret: Zeroizing<[u8; KEY_LEN]> = Zeroizing::new(
                    raw.as_slice()
                        .try_into()
                        .map_err(|_| WalletError::DecryptionFailure)?,
                );
                KeyPair::import_raw_secret(&secret, profile.version)
            }
        };

        if pair.encoded_public_key() != profile.public_key {
            warn!(alias = %profile.alias, "Stored key material does not match profile");
            return Err(WalletError::KeyMismatch);
        }
        Ok(pair)
    }

    /// PIN-gated backup export: the mnemonic phrase or the encoded secret key.
    pub fn export_secret(&self, alias: &str, pin: &str) -> WalletResult<ExportedSecret> {
        self.require_pin(pin)?;
        let profile = self.get_wallet(alias)?;

        let exported = match profile.kind {
            WalletKind::Mnemonic => {
                let mnemonic = self.load_mnemonic(alias)?;
                ExportedSecret::Mnemonic(Zeroizing::new(mnemonic.phrase().to_string()))
            }
            WalletKind::ImportedKey => {
                ExportedSecret::SecretKey(self.load_key_pair(&profile)?.encoded_secret_key())
            }
        };

        warn!(alias = %alias, "Secret exported");
        self.audit
            .record(AuditEvent::new(AuditEventType::SecretExported).with_wallet(alias));
        Ok(exported)
    }

    // =========================================================================
    // PIN and settings
    // =========================================================================

    /// Set the PIN. Replacing an existing PIN requires the current one;
    /// a missing or wrong `current` is [`WalletError::InvalidPin`].
    pub fn set_pin(&self, current: Option<&str>, new_pin: &str) -> WalletResult<()> {
        if self.store.pin_verifier()?.is_some() {
            match current {
                Some(current) => self.require_pin(current)?,
                None => {
                    warn!("PIN change without current PIN rejected");
                    self.audit.record(
                        AuditEvent::new(AuditEventType::PinFailed).failed("current pin missing"),
                    );
                    return Err(WalletError::InvalidPin);
                }
            }
        }

        let verifier = pin::hash_pin(new_pin)?;
        self.store.set_pin_verifier(&verifier)?;
        info!("PIN set");
        self.audit.record(AuditEvent::new(AuditEventType::PinSet));
        Ok(())
    }

    /// Check a PIN. `Ok(false)` on mismatch, [`WalletError::PinNotSet`] if
    /// no verifier is stored.
    pub fn verify_pin(&self, pin: &str) -> WalletResult<bool> {
        let verifier = self.store.pin_verifier()?.ok_or(WalletError::PinNotSet)?;
        let ok = pin::verify_pin(pin, &verifier)?;

        let event = AuditEvent::new(if ok {
            AuditEventType::PinVerified
        } else {
            AuditEventType::PinFailed
        });
        self.audit
            .record(if ok { event } else { event.failed("pin mismatch") });
        Ok(ok)
    }

    fn require_pin(&self, pin: &str) -> WalletResult<()> {
        if self.verify_pin(pin)? {
            Ok(())
        } else {
            Err(WalletError::InvalidPin)
        }
    }

    pub fn set_biometric_enabled(&self, enabled: bool) -> WalletResult<()> {
        self.store.set_flag(entry::BIOMETRIC_ENABLED, enabled)?;
        self.audit.record(
            AuditEvent::new(AuditEventType::BiometricToggled)
                .with_details(serde_json::json!({ "enabled": enabled })),
        );
        Ok(())
    }

    pub fn biometric_enabled(&self) -> WalletResult<bool> {
        Ok(self.store.flag(entry::BIOMETRIC_ENABLED)?)
    }

    pub fn complete_onboarding(&self) -> WalletResult<()> {
        self.store.set_flag(entry::ONBOARDING_COMPLETED, true)?;
        self.audit
            .record(AuditEvent::new(AuditEventType::OnboardingCompleted));
        Ok(())
    }

    pub fn onboarding_completed(&self) -> WalletResult<bool> {
        Ok(self.store.flag(entry::ONBOARDING_COMPLETED)?)
    }

    pub fn settings(&self) -> WalletResult<VaultSettings> {
        Ok(VaultSettings {
            biometric_enabled: self.biometric_enabled()?,
            onboarding_completed: self.onboarding_completed()?,
            pin_set: self.store.pin_verifier()?.is_some(),
        })
    }

    /// Erase every wallet, flag and the PIN verifier.
    pub fn clear(&self) -> WalletResult<()> {
        self.store.clear()?;
        warn!("Vault cleared");
        self.audit.record(AuditEvent::new(AuditEventType::StoreCleared));
        Ok(())
    }

    /// True if the envelope master key is usable.
    pub fn is_ready(&self) -> bool {
        self.store.envelope().is_available()
    }
}

// =============================================================================
// WalletSession (async)
// =============================================================================

/// Cloneable async handle over a [`VaultCore`].
#[derive(Clone)]
pub struct WalletSession {
    core: Arc<VaultCore>,
}

impl WalletSession {
    pub fn new(core: VaultCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// Open the vault described by `config` with the file-backed key store.
    pub fn open(config: &VaultConfig) -> WalletResult<Self> {
        let paths = StoragePaths::new(&config.data_dir);
        let provider = FileKeyStore::open(paths.master_key_file())?;
        let core = VaultCore::open(
            &config.data_dir,
            Arc::new(provider),
            &config.master_key_alias,
            config.coin_type,
        )?;
        Ok(Self::new(core))
    }

    pub fn core(&self) -> &VaultCore {
        &self.core
    }

    async fn blocking<T, F>(&self, f: F) -> WalletResult<T>
    where
        F: FnOnce(&VaultCore) -> WalletResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || f(&core))
            .await
            .map_err(|e| WalletError::Internal(format!("blocking task failed: {e}")))?
    }

    pub async fn create_wallet(&self, label: Option<String>) -> WalletResult<WalletProfile> {
        self.blocking(move |core| core.create_wallet(label)).await
    }

    pub async fn import_from_mnemonic(
        &self,
        words: Vec<String>,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let words = Zeroizing::new(words);
        self.blocking(move |core| core.import_from_mnemonic(&words[..], label))
            .await
    }

    pub async fn import_from_raw_secret_key(
        &self,
        encoded_secret_key: String,
        expected_public_key: Option<String>,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        let encoded_secret_key = Zeroizing::new(encoded_secret_key);
        self.blocking(move |core| {
            core.import_from_raw_secret_key(
                &encoded_secret_key,
                expected_public_key.as_deref(),
                label,
            )
        })
        .await
    }

    pub async fn derive_account(
        &self,
        source_alias: String,
        index: u32,
        label: Option<String>,
    ) -> WalletResult<WalletProfile> {
        self.blocking(move |core| core.derive_account(&source_alias, index, label))
            .await
    }

    pub async fn list_wallets(&self) -> WalletResult<Vec<WalletProfile>> {
        self.blocking(|core| core.list_wallets()).await
    }

    pub async fn get_wallet(&self, alias: String) -> WalletResult<WalletProfile> {
        self.blocking(move |core| core.get_wallet(&alias)).await
    }

    pub async fn active_wallet(&self) -> WalletResult<Option<WalletProfile>> {
        self.blocking(|core| core.active_wallet()).await
    }

    pub async fn set_active_wallet(&self, address: Address) -> WalletResult<WalletProfile> {
        self.blocking(move |core| core.set_active_wallet(&address))
            .await
    }

    pub async fn sign(&self, alias: String, message: Vec<u8>) -> WalletResult<Signature> {
        self.blocking(move |core| core.sign(&alias, &message)).await
    }

    pub async fn verify(
        &self,
        public_key: String,
        message: Vec<u8>,
        signature: Vec<u8>,
    ) -> WalletResult<bool> {
        self.blocking(move |core| core.verify(&public_key, &message, &signature))
            .await
    }

    pub async fn set_pin(&self, current: Option<String>, new_pin: String) -> WalletResult<()> {
        let current = current.map(Zeroizing::new);
        let new_pin = Zeroizing::new(new_pin);
        self.blocking(move |core| core.set_pin(current.as_deref().map(String::as_str), &new_pin))
            .await
    }

    pub async fn verify_pin(&self, pin: String) -> WalletResult<bool> {
        let pin = Zeroizing::new(pin);
        self.blocking(move |core| core.verify_pin(&pin)).await
    }

    pub async fn export_secret(&self, alias: String, pin: String) -> WalletResult<ExportedSecret> {
        let pin = Zeroizing::new(pin);
        self.blocking(move |core| core.export_secret(&alias, &pin))
            .await
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> WalletResult<()> {
        self.blocking(move |core| core.set_biometric_enabled(enabled))
            .await
    }

    pub async fn biometric_enabled(&self) -> WalletResult<bool> {
        self.blocking(|core| core.biometric_enabled()).await
    }

    pub async fn complete_onboarding(&self) -> WalletResult<()> {
        self.blocking(|core| core.complete_onboarding()).await
    }

    pub async fn onboarding_completed(&self) -> WalletResult<bool> {
        self.blocking(|core| core.onboarding_completed()).await
    }

    pub async fn settings(&self) -> WalletResult<VaultSettings> {
        self.blocking(|core| core.settings()).await
    }

    pub async fn has_wallet(&self) -> WalletResult<bool> {
        self.blocking(|core| core.has_wallet()).await
    }

    pub async fn clear(&self) -> WalletResult<()> {
        self.blocking(|core| core.clear()).await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::envelope::MemoryKeyStore;
    use crate::keys::derivation::DEFAULT_COIN_TYPE;
    use crate::keys::mnemonic::tests::abandon_art;

    const RFC8032_SECRET_V0: &str = "S12CK6vgUFHBTWVA9bMakzaB94Fhjuhwi4K6zQWU7tU8nKPfuUHe";
    const RFC8032_PUBLIC_V0: &str = "P12dqvheyJXzEYpywfm8g7TshzLbaXWTwHKQPkh4rYX3Db1zSMsn";
    const RFC8032_PUBLIC_V1: &str = "P4ab6w719xfTgeZeaLkg4nUUuTDJBDJp4xUVzqkkYB3c5dLH2vG";
    const OTHER_PUBLIC_V0: &str = "P1fLF2M8g6hfptET1D4tHmixCdHAdJCct1buNDrPrYgphoHR7uk";

    fn setup() -> (TempDir, Arc<MemoryKeyStore>, VaultCore) {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(MemoryKeyStore::new());
        let core = VaultCore::open(temp.path(), provider.clone(), "test_master", DEFAULT_COIN_TYPE)
            .unwrap();
        (temp, provider, core)
    }

    #[test]
    fn create_wallet_activates_and_persists_mnemonic() {
        let (_temp, _provider, core) = setup();
        assert!(!core.has_wallet().unwrap());

        let profile = core.create_wallet(Some("main".into())).unwrap();
        assert!(core.has_wallet().unwrap());
        assert_eq!(profile.kind, WalletKind::Mnemonic);
        assert_eq!(profile.derivation_path.as_deref(), Some("m/44'/297'/0'/0'/0'"));
        assert_eq!(core.active_wallet().unwrap(), Some(profile.clone()));
        assert!(core
            .store()
            .get(&profile.alias, SecretKind::Mnemonic)
            .unwrap()
            .is_some());
    }

    #[test]
    fn mnemonic_import_matches_fixture() {
        let (_temp, _provider, core) = setup();
        let profile = core.import_from_mnemonic(&abandon_art(), None).unwrap();

        assert_eq!(
            profile.public_key,
            "P1SdJbkVrPhJRhEeasCasnQSNQ5Zf6X2TSvsEP15xkaaSj4x2C7"
        );
        assert_eq!(
            profile.address.as_str(),
            "AU1nDeJ2tGX7Fm4y3BEfMkJ59gF6kZV3xWCXoQ9SiFFzwgDGVAwC"
        );
        assert!(core.has_wallet().unwrap());
    }

    #[test]
    fn invalid_mnemonic_is_rejected() {
        let (_temp, _provider, core) = setup();
        let words = vec!["abandon"; 24];
        assert!(matches!(
            core.import_from_mnemonic(&words, None),
            Err(WalletError::InvalidMnemonic(_))
        ));
        assert!(!core.has_wallet().unwrap());
    }

    #[test]
    fn raw_secret_import_with_cross_check() {
        let (_temp, _provider, core) = setup();

        let profile = core
            .import_from_raw_secret_key(RFC8032_SECRET_V0, Some(RFC8032_PUBLIC_V0), None)
            .unwrap();
        assert_eq!(profile.kind, WalletKind::ImportedKey);
        assert_eq!(
            profile.address.as_str(),
            "AU1FyJeV7M5jsBexAqntUdrgTLHdxS8zrMvugqWj5aFFgP2MGdzS"
        );
        assert!(core.has_wallet().unwrap());
    }

    #[test]
    fn raw_secret_import_rejects_mismatch() {
        let (_temp, _provider, core) = setup();
        assert_eq!(
            core.import_from_raw_secret_key(RFC8032_SECRET_V0, Some(OTHER_PUBLIC_V0), None)
                .unwrap_err(),
            WalletError::KeyMismatch
        );
        // Same key, other version tag
        assert_eq!(
            core.import_from_raw_secret_key(RFC8032_SECRET_V0, Some(RFC8032_PUBLIC_V1), None)
                .unwrap_err(),
            WalletError::KeyMismatch
        );
        assert!(!core.has_wallet().unwrap());
    }

    #[test]
    fn raw_secret_import_rejects_public_key_as_secret() {
        let (_temp, _provider, core) = setup();
        assert_eq!(
            core.import_from_raw_secret_key(RFC8032_PUBLIC_V0, None, None)
                .unwrap_err(),
            WalletError::Decode(DecodeError::BadPrefix)
        );
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let (_temp, _provider, core) = setup();
        let mnemonic_wallet = core.import_from_mnemonic(&abandon_art(), None).unwrap();
        let imported = core
            .import_from_raw_secret_key(RFC8032_SECRET_V0, None, None)
            .unwrap();

        for profile in [&mnemonic_wallet, &imported] {
            let sig = core.sign(&profile.alias, b"transfer 10").unwrap();
            assert!(core
                .verify(&profile.public_key, b"transfer 10", &sig.to_bytes())
                .unwrap());
            assert!(!core
                .verify(&profile.public_key, b"transfer 11", &sig.to_bytes())
                .unwrap());
        }
    }

    #[test]
    fn sign_unknown_alias_is_not_found() {
        let (_temp, _provider, core) = setup();
        assert!(matches!(
            core.sign("missing", b"x"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn sign_with_locked_key_store_fails() {
        let (_temp, provider, core) = setup();
        let profile = core.create_wallet(None).unwrap();

        provider.lock();
        assert_eq!(
            core.sign(&profile.alias, b"x").unwrap_err(),
            WalletError::AuthenticationRequired
        );
        provider.unlock();
        assert!(core.sign(&profile.alias, b"x").is_ok());
    }

    #[test]
    fn sign_with_lost_master_key_fails_closed() {
        let (_temp, provider, core) = setup();
        let profile = core.create_wallet(None).unwrap();

        provider.delete_key("test_master").unwrap();
        assert_eq!(
            core.sign(&profile.alias, b"x").unwrap_err(),
            WalletError::DecryptionFailure
        );
    }

    #[test]
    fn derive_account_adds_inactive_wallet() {
        let (_temp, _provider, core) = setup();
        let first = core.import_from_mnemonic(&abandon_art(), None).unwrap();
        let second = core
            .derive_account(&first.alias, 1, Some("savings".into()))
            .unwrap();

        assert_eq!(second.derivation_index, 1);
        assert_eq!(
            second.address.as_str(),
            "AU12E7iWF5vhsUYAUmB9wrk5Wg4UJTHhpf4BZirgYThWZi2NKfZ8d"
        );
        assert_eq!(core.list_wallets().unwrap().len(), 2);
        assert_eq!(core.active_wallet().unwrap(), Some(first));

        core.set_active_wallet(&second.address).unwrap();
        assert_eq!(core.active_wallet().unwrap(), Some(second.clone()));
        assert!(core.sign(&second.alias, b"x").is_ok());
    }

    #[test]
    fn derive_from_imported_key_is_rejected() {
        let (_temp, _provider, core) = setup();
        let imported = core
            .import_from_raw_secret_key(RFC8032_SECRET_V0, None, None)
            .unwrap();
        assert!(matches!(
            core.derive_account(&imported.alias, 1, None),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn set_active_wallet_requires_managed_address() {
        let (_temp, _provider, core) = setup();
        let unknown: Address = "AU1nDeJ2tGX7Fm4y3BEfMkJ59gF6kZV3xWCXoQ9SiFFzwgDGVAwC"
            .parse()
            .unwrap();
        assert!(matches!(
            core.set_active_wallet(&unknown),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn pin_flow_and_export() {
        let (_temp, _provider, core) = setup();
        let profile = core.import_from_mnemonic(&abandon_art(), None).unwrap();

        assert_eq!(core.verify_pin("1234").unwrap_err(), WalletError::PinNotSet);
        assert_eq!(core.set_pin(None, "12").unwrap_err(), WalletError::InvalidPin);

        core.set_pin(None, "482913").unwrap();
        assert!(core.verify_pin("482913").unwrap());
        assert!(!core.verify_pin("000000").unwrap());

        assert_eq!(
            core.export_secret(&profile.alias, "000000").unwrap_err(),
            WalletError::InvalidPin
        );
        let exported = core.export_secret(&profile.alias, "482913").unwrap();
        assert!(matches!(exported, ExportedSecret::Mnemonic(_)));
        assert_eq!(exported.expose(), abandon_art().join(" "));

        let imported = core
            .import_from_raw_secret_key(RFC8032_SECRET_V0, None, None)
            .unwrap();
        let exported = core.export_secret(&imported.alias, "482913").unwrap();
        assert_eq!(exported.expose(), RFC8032_SECRET_V0);
    }

    #[test]
    fn changing_pin_requires_current_pin() {
        let (_temp, _provider, core) = setup();
        let profile = core.import_from_mnemonic(&abandon_art(), None).unwrap();
        core.set_pin(None, "482913").unwrap();

        assert_eq!(core.set_pin(None, "0000").unwrap_err(), WalletError::InvalidPin);
        assert_eq!(
            core.set_pin(Some("111111"), "0000").unwrap_err(),
            WalletError::InvalidPin
        );
        assert_eq!(
            core.export_secret(&profile.alias, "0000").unwrap_err(),
            WalletError::InvalidPin
        );
        assert!(core.verify_pin("482913").unwrap());

        core.set_pin(Some("482913"), "0000").unwrap();
        assert!(core.verify_pin("0000").unwrap());
        assert!(!core.verify_pin("482913").unwrap());

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let failures = core
            .audit()
            .read_events(&today)
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::PinFailed)
            .count();
        assert!(failures >= 3);
    }

    #[test]
    fn deriving_managed_index_keeps_existing_profile() {
        let (_temp, _provider, core) = setup();
        let main = core
            .import_from_mnemonic(&abandon_art(), Some("main".into()))
            .unwrap();
        let second = core.derive_account(&main.alias, 1, None).unwrap();

        let again = core.derive_account(&second.alias, 0, None).unwrap();
        assert_eq!(again, main);
        assert_eq!(core.get_wallet(&main.alias).unwrap().label.as_deref(), Some("main"));

        let aliases: Vec<_> = core
            .list_wallets()
            .unwrap()
            .into_iter()
            .map(|p| p.alias)
            .collect();
        assert_eq!(aliases, [main.alias.clone(), second.alias]);
        assert_eq!(core.active_wallet().unwrap(), Some(main));
    }

    #[test]
    fn settings_flags() {
        let (_temp, _provider, core) = setup();
        assert_eq!(core.settings().unwrap(), VaultSettings::default());

        core.set_biometric_enabled(true).unwrap();
        core.complete_onboarding().unwrap();
        core.set_pin(None, "1234").unwrap();

        let settings = core.settings().unwrap();
        assert!(settings.biometric_enabled);
        assert!(settings.onboarding_completed);
        assert!(settings.pin_set);
    }

    #[test]
    fn clear_resets_everything() {
        let (_temp, _provider, core) = setup();
        core.create_wallet(None).unwrap();
        core.set_pin(None, "1234").unwrap();
        assert!(core.has_wallet().unwrap());

        core.clear().unwrap();
        assert!(!core.has_wallet().unwrap());
        assert!(core.list_wallets().unwrap().is_empty());
        assert_eq!(core.settings().unwrap(), VaultSettings::default());
    }

    #[test]
    fn operations_are_audited() {
        let (_temp, _provider, core) = setup();
        let profile = core.create_wallet(None).unwrap();
        core.sign(&profile.alias, b"x").unwrap();

        let events = core.audit().events_for_wallet(&profile.alias).unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            [AuditEventType::WalletCreated, AuditEventType::MessageSigned]
        );
    }

    #[tokio::test]
    async fn async_session_runs_on_blocking_pool() {
        let temp = TempDir::new().unwrap();
        let core = VaultCore::open(
            temp.path(),
            Arc::new(MemoryKeyStore::new()),
            "test_master",
            DEFAULT_COIN_TYPE,
        )
        .unwrap();
        let session = WalletSession::new(core);

        assert!(!session.has_wallet().await.unwrap());
        let profile = session.create_wallet(Some("async".into())).await.unwrap();
        assert!(session.has_wallet().await.unwrap());

        let sig = session
            .sign(profile.alias.clone(), b"hello".to_vec())
            .await
            .unwrap();
        assert!(session
            .verify(profile.public_key.clone(), b"hello".to_vec(), sig.to_bytes().to_vec())
            .await
            .unwrap());

        session.clear().await.unwrap();
        assert!(!session.has_wallet().await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_imports_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let core = VaultCore::open(
            temp.path(),
            Arc::new(MemoryKeyStore::new()),
            "test_master",
            DEFAULT_COIN_TYPE,
        )
        .unwrap();
        let session = WalletSession::new(core);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.create_wallet(None).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let wallets = session.list_wallets().await.unwrap();
        assert_eq!(wallets.len(), 8);
        for wallet in &wallets {
            assert!(session.sign(wallet.alias.clone(), b"x".to_vec()).await.is_ok());
        }
        assert!(session.has_wallet().await.unwrap());
    }
}
