// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Per-install bearer token for the `/v1` API.
//!
//! ## Flow
//!
//! 1. On first start the daemon writes a random token to `<DATA_DIR>/api_token`
//!    (owner read/write only)
//! 2. The wallet UI reads the file and sends `Authorization: Bearer <token>`
//! 3. [`middleware::require_token`] rejects any `/v1` request without it
//!
//! Health and docs routes stay open.

pub mod error;
pub mod middleware;
pub mod token;

pub use error::AuthError;
pub use middleware::require_token;
pub use token::{ApiToken, TokenError};
