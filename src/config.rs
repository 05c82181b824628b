// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults. Configuration is loaded once at
//! startup via [`VaultConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the vault database, keys and audit log | `./data` |
//! | `HOST` | Server bind address | `127.0.0.1` |
//! | `PORT` | Server bind port | `8737` |
//! | `MASTER_KEY_ALIAS` | Alias of the envelope master key | `relational_vault_master` |
//! | `COIN_TYPE` | BIP-44 coin type used for derivation paths | `297` |
//! | `ALLOWED_ORIGINS` | Comma-separated browser origins allowed by CORS | none (CORS off) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use crate::keys::derivation::DEFAULT_COIN_TYPE;

/// Environment variable name for the vault data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const MASTER_KEY_ALIAS_ENV: &str = "MASTER_KEY_ALIAS";
pub const COIN_TYPE_ENV: &str = "COIN_TYPE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";

pub const DEFAULT_DATA_DIR: &str = "./data";
/// Loopback only. The daemon has no transport security of its own.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8737;
pub const DEFAULT_MASTER_KEY_ALIAS: &str = "relational_vault_master";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub master_key_alias: String,
    pub coin_type: u32,
    pub log_format: LogFormat,
    pub allowed_origins: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            master_key_alias: DEFAULT_MASTER_KEY_ALIAS.to_string(),
            coin_type: DEFAULT_COIN_TYPE,
            log_format: LogFormat::Pretty,
            allowed_origins: Vec::new(),
        }
    }
}

impl VaultConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unparseable numbers fall back to
    /// their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = parse_or(lookup(PORT_ENV), PORT_ENV, defaults.port);
        let coin_type = parse_or(lookup(COIN_TYPE_ENV), COIN_TYPE_ENV, defaults.coin_type);
        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            host: lookup(HOST_ENV).unwrap_or(defaults.host),
            port,
            master_key_alias: lookup(MASTER_KEY_ALIAS_ENV)
                .filter(|alias| !alias.trim().is_empty())
                .unwrap_or(defaults.master_key_alias),
            coin_type,
            log_format,
            allowed_origins: lookup(ALLOWED_ORIGINS_ENV)
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    raw: Option<String>,
    name: &str,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %value, default = %default, "Invalid value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> VaultConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VaultConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config, VaultConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:8737");
        assert_eq!(config.coin_type, 297);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            (DATA_DIR_ENV, "/var/lib/vault"),
            (HOST_ENV, "0.0.0.0"),
            (PORT_ENV, "9000"),
            (MASTER_KEY_ALIAS_ENV, "custom"),
            (COIN_TYPE_ENV, "1"),
            (LOG_FORMAT_ENV, "JSON"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/vault"));
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.master_key_alias, "custom");
        assert_eq!(config.coin_type, 1);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[(PORT_ENV, "not-a-port"), (COIN_TYPE_ENV, "-3")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.coin_type, DEFAULT_COIN_TYPE);
    }

    #[test]
    fn allowed_origins_are_split_and_trimmed() {
        let config = config_from(&[(
            ALLOWED_ORIGINS_ENV,
            " http://localhost:5173/ ,, tauri://localhost",
        )]);
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173".to_string(), "tauri://localhost".to_string()]
        );
    }

    #[test]
    fn blank_alias_uses_default() {
        let config = config_from(&[(MASTER_KEY_ALIAS_ENV, "  ")]);
        assert_eq!(config.master_key_alias, DEFAULT_MASTER_KEY_ALIAS);
    }
}
