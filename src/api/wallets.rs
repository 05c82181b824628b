// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet management API endpoints.
//!
//! Creation, import, account derivation, active-wallet selection and signing.
//! Responses carry public material only; secrets never leave the vault over
//! HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::{error::ApiError, keys::Address, models::WalletProfile, state::AppState};

// =============================================================================
// Request / Response types
// =============================================================================

/// Request to create a new wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// Optional human-readable label for the wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Request to import a wallet from a 24-word recovery phrase.
#[derive(Deserialize, ToSchema)]
pub struct ImportMnemonicRequest {
    /// Space-separated recovery phrase.
    pub mnemonic: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Request to import a wallet from an encoded secret key.
#[derive(Deserialize, ToSchema)]
pub struct ImportSecretKeyRequest {
    /// Encoded secret key (`S...`).
    pub secret_key: String,
    /// Encoded public key (`P...`) the secret key must produce.
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Request to derive another account from a mnemonic wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeriveAccountRequest {
    /// Account index (last path segment, always hardened).
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetActiveWalletRequest {
    pub address: Address,
}

/// How a message payload is encoded in the request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    #[default]
    Utf8,
    Base64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignRequest {
    pub message: String,
    #[serde(default)]
    pub encoding: MessageEncoding,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignResponse {
    /// Base64 encoded 64-byte Ed25519 signature.
    pub signature: String,
    pub public_key: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Encoded public key (`P...`).
    pub public_key: String,
    pub message: String,
    #[serde(default)]
    pub encoding: MessageEncoding,
    /// Base64 encoded signature.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// Response containing a list of wallets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletListResponse {
    pub wallets: Vec<WalletProfile>,
    pub total: usize,
    /// Address of the active wallet, if one is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClearResponse {
    pub message: String,
}

fn decode_message(message: &str, encoding: MessageEncoding) -> Result<Vec<u8>, ApiError> {
    match encoding {
        MessageEncoding::Utf8 => Ok(message.as_bytes().to_vec()),
        MessageEncoding::Base64 => Base64::decode_vec(message)
            .map_err(|_| ApiError::bad_request("message is not valid base64")),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new wallet from a freshly generated mnemonic.
///
/// The new wallet becomes the active wallet.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletProfile),
        (status = 503, description = "Secure storage unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletProfile>), ApiError> {
    let profile = state.session.create_wallet(request.label).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// List every managed wallet, oldest first.
#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    responses(
        (status = 200, description = "List of wallets", body = WalletListResponse)
    )
)]
pub async fn list_wallets(
    State(state): State<AppState>,
) -> Result<Json<WalletListResponse>, ApiError> {
    let wallets = state.session.list_wallets().await?;
    let active = state.session.active_wallet().await?.map(|p| p.address);
    let total = wallets.len();

    Ok(Json(WalletListResponse {
        wallets,
        total,
        active,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{alias}",
    tag = "Wallets",
    params(
        ("alias" = String, Path, description = "Wallet alias")
    ),
    responses(
        (status = 200, description = "Wallet details", body = WalletProfile),
        (status = 404, description = "Wallet not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<WalletProfile>, ApiError> {
    Ok(Json(state.session.get_wallet(alias).await?))
}

/// Import a wallet from a recovery phrase.
#[utoipa::path(
    post,
    path = "/v1/wallets/import/mnemonic",
    tag = "Wallets",
    request_body = ImportMnemonicRequest,
    responses(
        (status = 201, description = "Wallet imported", body = WalletProfile),
        (status = 400, description = "Invalid mnemonic", body = crate::error::ErrorBody)
    )
)]
pub async fn import_mnemonic(
    State(state): State<AppState>,
    Json(request): Json<ImportMnemonicRequest>,
) -> Result<(StatusCode, Json<WalletProfile>), ApiError> {
    let phrase = Zeroizing::new(request.mnemonic);
    let words: Vec<String> = phrase.split_whitespace().map(str::to_string).collect();
    let profile = state
        .session
        .import_from_mnemonic(words, request.label)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Import a wallet from an encoded secret key, optionally cross-checked
/// against the expected public key.
#[utoipa::path(
    post,
    path = "/v1/wallets/import/secret-key",
    tag = "Wallets",
    request_body = ImportSecretKeyRequest,
    responses(
        (status = 201, description = "Wallet imported", body = WalletProfile),
        (status = 400, description = "Malformed key", body = crate::error::ErrorBody),
        (status = 409, description = "Secret key does not match public key", body = crate::error::ErrorBody)
    )
)]
pub async fn import_secret_key(
    State(state): State<AppState>,
    Json(request): Json<ImportSecretKeyRequest>,
) -> Result<(StatusCode, Json<WalletProfile>), ApiError> {
    let profile = state
        .session
        .import_from_raw_secret_key(request.secret_key, request.public_key, request.label)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Derive another account from a mnemonic wallet. The active wallet is
/// left unchanged.
#[utoipa::path(
    post,
    path = "/v1/wallets/{alias}/accounts",
    tag = "Wallets",
    params(
        ("alias" = String, Path, description = "Alias of the source mnemonic wallet")
    ),
    request_body = DeriveAccountRequest,
    responses(
        (status = 201, description = "Account derived", body = WalletProfile),
        (status = 404, description = "Wallet or mnemonic not found", body = crate::error::ErrorBody)
    )
)]
pub async fn derive_account(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(request): Json<DeriveAccountRequest>,
) -> Result<(StatusCode, Json<WalletProfile>), ApiError> {
    let profile = state
        .session
        .derive_account(alias, request.index, request.label)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/active",
    tag = "Wallets",
    responses(
        (status = 200, description = "Active wallet", body = WalletProfile),
        (status = 404, description = "No active wallet", body = crate::error::ErrorBody)
    )
)]
pub async fn get_active_wallet(
    State(state): State<AppState>,
) -> Result<Json<WalletProfile>, ApiError> {
    state
        .session
        .active_wallet()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no active wallet"))
}

#[utoipa::path(
    put,
    path = "/v1/wallets/active",
    tag = "Wallets",
    request_body = SetActiveWalletRequest,
    responses(
        (status = 200, description = "Active wallet changed", body = WalletProfile),
        (status = 404, description = "Address is not a managed wallet", body = crate::error::ErrorBody)
    )
)]
pub async fn set_active_wallet(
    State(state): State<AppState>,
    Json(request): Json<SetActiveWalletRequest>,
) -> Result<Json<WalletProfile>, ApiError> {
    Ok(Json(state.session.set_active_wallet(request.address).await?))
}

/// Sign a message with the wallet's key.
#[utoipa::path(
    post,
    path = "/v1/wallets/{alias}/sign",
    tag = "Signing",
    params(
        ("alias" = String, Path, description = "Wallet alias")
    ),
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signature", body = SignResponse),
        (status = 404, description = "Wallet not found", body = crate::error::ErrorBody),
        (status = 503, description = "Device authentication required", body = crate::error::ErrorBody)
    )
)]
pub async fn sign_message(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>, ApiError> {
    let message = decode_message(&request.message, request.encoding)?;
    let profile = state.session.get_wallet(alias.clone()).await?;
    let signature = state.session.sign(alias, message).await?;

    Ok(Json(SignResponse {
        signature: Base64::encode_string(&signature.to_bytes()),
        public_key: profile.public_key,
        address: profile.address,
    }))
}

/// Verify a signature against an encoded public key.
#[utoipa::path(
    post,
    path = "/v1/signatures/verify",
    tag = "Signing",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifyResponse),
        (status = 400, description = "Malformed key or signature", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let message = decode_message(&request.message, request.encoding)?;
    let signature = Base64::decode_vec(&request.signature)
        .map_err(|_| ApiError::bad_request("signature is not valid base64"))?;
    let valid = state
        .session
        .verify(request.public_key, message, signature)
        .await?;
    Ok(Json(VerifyResponse { valid }))
}

/// Erase every wallet, flag and the PIN verifier.
#[utoipa::path(
    delete,
    path = "/v1/wallets",
    tag = "Wallets",
    responses(
        (status = 200, description = "Vault cleared", body = ClearResponse)
    )
)]
pub async fn clear_wallets(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    state.session.clear().await?;
    Ok(Json(ClearResponse {
        message: "Vault cleared".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_encodings() {
        assert_eq!(
            decode_message("hi", MessageEncoding::Utf8).unwrap(),
            b"hi".to_vec()
        );
        assert_eq!(
            decode_message("aGk=", MessageEncoding::Base64).unwrap(),
            b"hi".to_vec()
        );
        let err = decode_message("***", MessageEncoding::Base64).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn encoding_defaults_to_utf8() {
        let request: SignRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(request.encoding, MessageEncoding::Utf8);
    }
}
