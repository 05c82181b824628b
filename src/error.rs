// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::envelope::EnvelopeError;
use crate::keys::{DecodeError, KeyError, MnemonicError};
use crate::pin::PinError;
use crate::storage::StoreError;

// =============================================================================
// Facade errors
// =============================================================================

/// Every failure the wallet session can return. All variants are
/// recoverable by the caller; none is ever downgraded to a default value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] MnemonicError),

    #[error("invalid key: {0}")]
    Decode(#[from] DecodeError),

    #[error("derived public key does not match the supplied public key")]
    KeyMismatch,

    #[error("decryption failed")]
    DecryptionFailure,

    #[error("secure storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("device authentication required")]
    AuthenticationRequired,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("secure random source unavailable")]
    EntropySourceUnavailable,

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("invalid PIN")]
    InvalidPin,

    #[error("no PIN has been set")]
    PinNotSet,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<KeyError> for WalletError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::InvalidMnemonic(inner) => WalletError::InvalidMnemonic(inner),
            KeyError::Decode(inner) => WalletError::Decode(inner),
            KeyError::KeyMismatch => WalletError::KeyMismatch,
            KeyError::InvalidPath(msg) => WalletError::InvalidPath(msg),
            KeyError::EntropySourceUnavailable => WalletError::EntropySourceUnavailable,
            KeyError::InvalidSignature => WalletError::InvalidSignature,
        }
    }
}

impl From<EnvelopeError> for WalletError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::DecryptionFailure => WalletError::DecryptionFailure,
            EnvelopeError::StorageUnavailable(msg) => WalletError::StorageUnavailable(msg),
            EnvelopeError::AuthenticationRequired => WalletError::AuthenticationRequired,
            EnvelopeError::EntropySourceUnavailable => WalletError::EntropySourceUnavailable,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Envelope(inner) => inner.into(),
            other => WalletError::Storage(other.to_string()),
        }
    }
}

impl From<PinError> for WalletError {
    fn from(e: PinError) -> Self {
        match e {
            PinError::InvalidFormat => WalletError::InvalidPin,
            PinError::EntropySourceUnavailable => WalletError::EntropySourceUnavailable,
            PinError::MalformedVerifier => WalletError::Storage(e.to_string()),
            PinError::Hash(msg) => WalletError::Internal(msg),
        }
    }
}

// =============================================================================
// HTTP errors
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        let message = e.to_string();
        match e {
            WalletError::InvalidMnemonic(_)
            | WalletError::Decode(_)
            | WalletError::InvalidPath(_)
            | WalletError::InvalidSignature => ApiError::bad_request(message),
            WalletError::KeyMismatch => ApiError::conflict(message),
            WalletError::InvalidPin | WalletError::PinNotSet => ApiError::unauthorized(message),
            WalletError::NotFound(_) => ApiError::not_found(message),
            WalletError::DecryptionFailure => ApiError::unprocessable(message),
            WalletError::StorageUnavailable(_) | WalletError::AuthenticationRequired => {
                ApiError::service_unavailable(message)
            }
            WalletError::EntropySourceUnavailable
            | WalletError::Storage(_)
            | WalletError::Internal(_) => {
                tracing::error!(error = %message, "Wallet operation failed");
                ApiError::internal("internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn wallet_errors_map_to_status_codes() {
        let cases = [
            (WalletError::Decode(DecodeError::ChecksumMismatch), StatusCode::BAD_REQUEST),
            (
                WalletError::InvalidMnemonic(MnemonicError::Checksum),
                StatusCode::BAD_REQUEST,
            ),
            (WalletError::KeyMismatch, StatusCode::CONFLICT),
            (WalletError::InvalidPin, StatusCode::UNAUTHORIZED),
            (WalletError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (WalletError::DecryptionFailure, StatusCode::UNPROCESSABLE_ENTITY),
            (WalletError::AuthenticationRequired, StatusCode::SERVICE_UNAVAILABLE),
            (WalletError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let api = ApiError::from(WalletError::Storage("redb path /secret".into()));
        assert_eq!(api.message, "internal error");
    }

    #[test]
    fn store_envelope_errors_keep_their_meaning() {
        let e: WalletError = StoreError::Envelope(EnvelopeError::DecryptionFailure).into();
        assert_eq!(e, WalletError::DecryptionFailure);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
