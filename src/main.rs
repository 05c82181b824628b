// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relational_key_vault::{
    api::router,
    auth::{ApiToken, TokenError},
    config::{LogFormat, VaultConfig, DEFAULT_LOG_FILTER},
    error::WalletError,
    session::WalletSession,
    state::AppState,
    storage::StoragePaths,
};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("failed to create data directory: {0}")]
    DataDir(std::io::Error),

    #[error("failed to open vault: {0}")]
    Vault(#[from] WalletError),

    #[error("failed to load API token: {0}")]
    Token(#[from] TokenError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run(config: VaultConfig) -> Result<(), StartupError> {
    std::fs::create_dir_all(&config.data_dir).map_err(StartupError::DataDir)?;

    let session = WalletSession::open(&config)?;
    let has_wallet = session.has_wallet().await?;
    info!(
        data_dir = %config.data_dir.display(),
        has_wallet,
        "Vault opened"
    );

    let token_path = StoragePaths::new(&config.data_dir).api_token_file();
    let api_token = ApiToken::load_or_create(&token_path)?;
    info!(
        token_file = %token_path.display(),
        allowed_origins = ?config.allowed_origins,
        "API access configured"
    );

    let state = AppState::new(session, config.data_dir.clone(), api_token)
        .with_allowed_origins(config.allowed_origins.clone());
    let app = router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Relational Key Vault listening on http://{addr} (docs at /docs)");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(StartupError::Serve)?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = VaultConfig::from_env();
    init_tracing(config.log_format);
    info!("Starting Relational Key Vault v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
