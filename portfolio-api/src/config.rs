//! Service configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use portfolio_store::cache::DEFAULT_MAX_ENTRIES;
use portfolio_store::login_attempts::{DEFAULT_LOCK_WINDOW, DEFAULT_MAX_ATTEMPTS};

/// Placeholder secret; production startup refuses it.
pub const DEFAULT_JWT_SECRET: &str = "change-me-super-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,

    #[error("ADMIN_PASSWORD must be at least 10 characters in production")]
    WeakAdminPassword,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: String,
    pub port: u16,
    pub api_prefix: String,
    pub data_file: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub admin_email: String,
    pub admin_password: String,
    pub cors_origins: Vec<String>,
    /// When true, the first `X-Forwarded-For` hop is trusted as the
    /// client address for lockout accounting.
    pub trust_proxy: bool,
    pub login_max_attempts: u32,
    pub login_lock_window: Duration,
    pub cache_max_entries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            env: env_or("APP_ENV", "development"),
            port: parse_or("PORT", 3000),
            api_prefix: env_or("API_PREFIX", "/api/v1"),
            data_file: PathBuf::from(env_or("DATA_FILE", "data/db.json")),
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            jwt_ttl_minutes: parse_or("JWT_TTL_MINUTES", 30),
            admin_email: env_or("ADMIN_EMAIL", "admin@portfolio.local"),
            admin_password: env_or("ADMIN_PASSWORD", "ChangeMe123!"),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            trust_proxy: parse_or("TRUST_PROXY", false),
            login_max_attempts: parse_or("LOGIN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            login_lock_window: Duration::from_secs(parse_or(
                "LOGIN_LOCK_WINDOW_SECS",
                DEFAULT_LOCK_WINDOW.as_secs(),
            )),
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES),
        };

        config.validate_production()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    fn validate_production(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        if self.admin_password.len() < 10 {
            return Err(ConfigError::WeakAdminPassword);
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unparseable values fall back to the default rather than failing
/// startup; production-sensitive fields are validated separately.
fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
