use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Process-wide configuration, read once at startup and validated eagerly
/// so a misconfigured deployment fails before it does any work (§6
/// "Configuration").
#[derive(Debug, Clone)]
pub struct Config {
    #[allow(dead_code)]
    pub telegram_bot_token: String,
    pub database_path: PathBuf,
    #[allow(dead_code)]
    pub jwt_secret_key: String,
    #[allow(dead_code)]
    pub jwt_expiration_minutes: u32,
    #[allow(dead_code)]
    pub cors_allowed_origins: Vec<String>,
    pub log_level: String,
}

const MIN_JWT_SECRET_BYTES: usize = 32;
const DEFAULT_JWT_EXPIRATION_MINUTES: u32 = 60;

impl Config {
    /// Read and validate configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid variable.
    pub fn from_env() -> Result<Self> {
        let telegram_bot_token =
            require_env("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is required")?;

        let database_path = match std::env::var("DATABASE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_database_path()?,
        };

        let jwt_secret_key = require_env("JWT_SECRET_KEY").context("JWT_SECRET_KEY is required")?;
        if jwt_secret_key.len() < MIN_JWT_SECRET_BYTES {
            bail!("JWT_SECRET_KEY must be at least {MIN_JWT_SECRET_BYTES} bytes");
        }

        let jwt_expiration_minutes = match std::env::var("JWT_EXPIRATION_MINUTES") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("JWT_EXPIRATION_MINUTES is not a valid integer: {raw}"))?,
            Err(_) => DEFAULT_JWT_EXPIRATION_MINUTES,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            telegram_bot_token,
            database_path,
            jwt_secret_key,
            jwt_expiration_minutes,
            cors_allowed_origins,
            log_level,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {key}"))
}

/// Default on-disk database location when `DATABASE_PATH` is unset.
///
/// # Errors
///
/// Returns an error if the platform's local data directory cannot be
/// determined.
fn default_database_path() -> Result<PathBuf> {
    let mut path = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to determine local data directory"))?;
    path.push("timesheet");
    path.push("timesheet.db");
    Ok(path)
}
