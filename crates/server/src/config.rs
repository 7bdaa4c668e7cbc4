// crates/server/src/config.rs
//! Server configuration from command-line flags and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rollcall_core::ValidationRules;
use rollcall_server_jobs::{ImportConfig, DEFAULT_MAX_BATCH_SIZE, DEV_PASSWORD_SALT};
use thiserror::Error;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47893;

#[derive(Debug, Clone, Parser)]
#[command(name = "rollcall", version, about = "Bulk member import server")]
pub struct Cli {
    /// Port to listen on (falls back to PORT).
    #[arg(long, env = "ROLLCALL_PORT")]
    pub port: Option<u16>,

    /// SQLite database file. Defaults to <data dir>/rollcall/rollcall.db.
    #[arg(long, env = "ROLLCALL_DB")]
    pub db: Option<PathBuf>,

    /// Seconds a finished job stays in memory before status is served from the database.
    #[arg(long, env = "ROLLCALL_REAP_GRACE_SECS", default_value_t = 60)]
    pub reap_grace_secs: u64,

    /// Salt for member password hashes.
    #[arg(long, env = "ROLLCALL_PASSWORD_SALT", hide_env_values = true)]
    pub password_salt: Option<String>,

    /// Country code for phone numbers given without one.
    #[arg(long, env = "ROLLCALL_DEFAULT_COUNTRY_CODE", default_value = "+1")]
    pub default_country_code: String,

    /// Largest accepted import batch.
    #[arg(long, env = "ROLLCALL_MAX_BATCH", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),

    #[error("invalid default country code {0:?}: expected '+' and 1-3 digits")]
    InvalidCountryCode(String),

    #[error("max batch size must be at least 1")]
    ZeroBatch,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` means the default location.
    pub db_path: Option<PathBuf>,
    pub import: ImportConfig,
}

impl ServerConfig {
    /// Build the config from parsed flags, consulting `PORT` when no port
    /// was given.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, std::env::var("PORT").ok())
    }

    fn resolve(cli: Cli, port_env: Option<String>) -> Result<Self, ConfigError> {
        let port = match (cli.port, port_env) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            (None, None) => DEFAULT_PORT,
        };

        if !is_country_code(&cli.default_country_code) {
            return Err(ConfigError::InvalidCountryCode(cli.default_country_code));
        }
        if cli.max_batch == 0 {
            return Err(ConfigError::ZeroBatch);
        }

        let password_salt = match cli.password_salt {
            Some(salt) if !salt.is_empty() => salt.into_bytes(),
            _ => {
                tracing::warn!("ROLLCALL_PASSWORD_SALT not set, using the development salt");
                DEV_PASSWORD_SALT.to_vec()
            }
        };

        Ok(Self {
            port,
            db_path: cli.db,
            import: ImportConfig {
                reap_grace: Duration::from_secs(cli.reap_grace_secs),
                password_salt,
                max_batch_size: cli.max_batch,
                rules: ValidationRules {
                    default_country_code: cli.default_country_code,
                },
            },
        })
    }
}

fn is_country_code(code: &str) -> bool {
    code.strip_prefix('+').is_some_and(|digits| {
        (1..=3).contains(&digits.len())
            && !digits.starts_with('0')
            && digits.chars().all(|c| c.is_ascii_digit())
    })
}
