// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault settings and PIN endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, models::VaultSettings, state::AppState};

/// Partial settings update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometric_enabled: Option<bool>,
    /// Onboarding can only be marked complete, never reset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
}

/// Set or change the PIN. `current_pin` is required once a PIN exists.
#[derive(Deserialize, ToSchema)]
pub struct SetPinRequest {
    #[serde(default)]
    pub current_pin: Option<String>,
    /// 4-12 ASCII digits.
    pub pin: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PinRequest {
    /// 4-12 ASCII digits.
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PinVerifyResponse {
    pub valid: bool,
}

#[utoipa::path(
    get,
    path = "/v1/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Current settings", body = VaultSettings)
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<VaultSettings>, ApiError> {
    Ok(Json(state.session.settings().await?))
}

#[utoipa::path(
    put,
    path = "/v1/settings",
    tag = "Settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated settings", body = VaultSettings),
        (status = 400, description = "Onboarding cannot be reset", body = crate::error::ErrorBody)
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<VaultSettings>, ApiError> {
    if request.onboarding_completed == Some(false) {
        return Err(ApiError::bad_request("onboarding cannot be reset"));
    }
    if let Some(enabled) = request.biometric_enabled {
        state.session.set_biometric_enabled(enabled).await?;
    }
    if request.onboarding_completed == Some(true) {
        state.session.complete_onboarding().await?;
    }
    Ok(Json(state.session.settings().await?))
}

/// Set the first PIN, or replace it given the current one.
#[utoipa::path(
    put,
    path = "/v1/settings/pin",
    tag = "Settings",
    request_body = SetPinRequest,
    responses(
        (status = 204, description = "PIN stored"),
        (status = 401, description = "Wrong current PIN or bad PIN format", body = crate::error::ErrorBody)
    )
)]
pub async fn set_pin(
    State(state): State<AppState>,
    Json(request): Json<SetPinRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .session
        .set_pin(request.current_pin, request.pin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/settings/pin/verify",
    tag = "Settings",
    request_body = PinRequest,
    responses(
        (status = 200, description = "Verification result", body = PinVerifyResponse),
        (status = 401, description = "No PIN has been set", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_pin(
    State(state): State<AppState>,
    Json(request): Json<PinRequest>,
) -> Result<Json<PinVerifyResponse>, ApiError> {
    let valid = state.session.verify_pin(request.pin).await?;
    Ok(Json(PinVerifyResponse { valid }))
}
