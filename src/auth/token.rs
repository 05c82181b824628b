// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The per-install API token.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::info;
use zeroize::Zeroizing;

use crate::envelope::file::create_private;

/// Random bytes behind a freshly generated token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("token file is empty")]
    Empty,
    #[error("system entropy source unavailable")]
    EntropySourceUnavailable,
}

/// Shared secret every `/v1` request must present.
#[derive(Clone)]
pub struct ApiToken(Arc<Zeroizing<String>>);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::new(Zeroizing::new(value.into())))
    }

    /// Generate a fresh random token.
    pub fn generate() -> Result<Self, TokenError> {
        let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
        OsRng
            .try_fill_bytes(&mut bytes[..])
            .map_err(|_| TokenError::EntropySourceUnavailable)?;
        Ok(Self::new(Base64UrlUnpadded::encode_string(&bytes[..])))
    }

    /// Read the token at `path`, or generate one and write it there with
    /// owner-only permissions.
    pub fn load_or_create(path: &Path) -> Result<Self, TokenError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                let raw = Zeroizing::new(raw);
                let value = raw.trim();
                if value.is_empty() {
                    return Err(TokenError::Empty);
                }
                Ok(Self::new(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let token = Self::generate()?;
                token.write_to(path)?;
                info!(path = %path.display(), "Generated API token");
                Ok(token)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        {
            let mut handle = create_private(&temp_path)?;
            handle.write_all(self.expose().as_bytes())?;
            handle.sync_all()?;
        }
        fs::rename(&temp_path, path)
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, candidate: &str) -> bool {
        self.expose().as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}
