// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_token,
    error::ErrorBody,
    keys::KeyVersion,
    models::{VaultSettings, WalletKind, WalletProfile},
    state::AppState,
};

pub mod health;
pub mod settings;
pub mod wallets;

/// Build the HTTP router. Every `/v1` route requires the API token; health
/// and docs routes do not.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    let v1_routes = Router::new()
        .route(
            "/wallets",
            get(wallets::list_wallets)
                .post(wallets::create_wallet)
                .delete(wallets::clear_wallets),
        )
        .route("/wallets/import/mnemonic", post(wallets::import_mnemonic))
        .route(
            "/wallets/import/secret-key",
            post(wallets::import_secret_key),
        )
        .route(
            "/wallets/active",
            get(wallets::get_active_wallet).put(wallets::set_active_wallet),
        )
        .route("/wallets/{alias}", get(wallets::get_wallet))
        .route("/wallets/{alias}/accounts", post(wallets::derive_account))
        .route("/wallets/{alias}/sign", post(wallets::sign_message))
        .route("/signatures/verify", post(wallets::verify_signature))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/settings/pin", put(settings::set_pin))
        .route("/settings/pin/verify", post(settings::verify_pin))
        .route_layer(middleware::from_fn_with_state(
            state.api_token.clone(),
            require_token,
        ))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let app = Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

/// CORS for the configured origins only. `None` when no origin is allowed,
/// so browsers get no `Access-Control-Allow-Origin` at all.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        wallets::create_wallet,
        wallets::list_wallets,
        wallets::get_wallet,
        wallets::import_mnemonic,
        wallets::import_secret_key,
        wallets::derive_account,
        wallets::get_active_wallet,
        wallets::set_active_wallet,
        wallets::sign_message,
        wallets::verify_signature,
        wallets::clear_wallets,
        settings::get_settings,
        settings::update_settings,
        settings::set_pin,
        settings::verify_pin,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletProfile,
            WalletKind,
            KeyVersion,
            VaultSettings,
            ErrorBody,
            wallets::CreateWalletRequest,
            wallets::ImportMnemonicRequest,
            wallets::ImportSecretKeyRequest,
            wallets::DeriveAccountRequest,
            wallets::SetActiveWalletRequest,
            wallets::MessageEncoding,
            wallets::SignRequest,
            wallets::SignResponse,
            wallets::VerifyRequest,
            wallets::VerifyResponse,
            wallets::WalletListResponse,
            wallets::ClearResponse,
            settings::UpdateSettingsRequest,
            settings::SetPinRequest,
            settings::PinRequest,
            settings::PinVerifyResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Wallets", description = "Wallet creation, import and selection"),
        (name = "Signing", description = "Message signing and verification"),
        (name = "Settings", description = "PIN, biometric and onboarding flags"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
