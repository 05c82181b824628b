// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;

use crate::auth::ApiToken;
use crate::session::WalletSession;

#[derive(Clone)]
pub struct AppState {
    pub session: WalletSession,
    pub data_dir: PathBuf,
    pub api_token: ApiToken,
    /// Browser origins allowed to call the API. Empty disables CORS.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(session: WalletSession, data_dir: impl Into<PathBuf>, api_token: ApiToken) -> Self {
        Self {
            session,
            data_dir: data_dir.into(),
            api_token,
            allowed_origins: Vec::new(),
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}
