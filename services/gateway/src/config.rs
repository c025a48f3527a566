//! services/gateway/src/config.rs
//!
//! Defines the gateway's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base URL of the external accounts API, without a trailing slash.
    pub accounts_api_url: String,
    pub log_level: Level,
    /// Applied to every outbound call to the accounts API.
    pub request_timeout: Duration,
    /// Upper bound for the user fetch the route guard makes per navigation.
    pub guard_timeout: Duration,
    /// Adds `Secure` to every session cookie.
    pub cookie_secure: bool,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            accounts_api_url: "http://localhost:8000".to_string(),
            log_level: Level::INFO,
            request_timeout: Duration::from_secs(10),
            guard_timeout: Duration::from_secs(5),
            cookie_secure: false,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let log_level = match lookup("RUST_LOG") {
            Some(raw) => raw.parse::<Level>().map_err(|_| {
                ConfigError::InvalidValue(
                    "RUST_LOG".to_string(),
                    format!("'{}' is not a valid log level", raw),
                )
            })?,
            None => defaults.log_level,
        };

        // --- Accounts API Settings ---
        let accounts_api_url = lookup("ACCOUNTS_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.accounts_api_url);
        if !accounts_api_url.starts_with("http://") && !accounts_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "ACCOUNTS_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", accounts_api_url),
            ));
        }

        let request_timeout = seconds(&lookup, "REQUEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout);
        let guard_timeout =
            seconds(&lookup, "GUARD_TIMEOUT_SECS")?.unwrap_or(defaults.guard_timeout);

        // --- Browser-facing Settings ---
        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => raw.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "COOKIE_SECURE".to_string(),
                    format!("'{}' is not true or false", raw),
                )
            })?,
            None => defaults.cookie_secure,
        };
        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            accounts_api_url,
            log_level,
            request_timeout,
            guard_timeout,
            cookie_secure,
            cors_origin,
        })
    }
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("'{}' is not a positive number of seconds", raw),
            )),
        })
        .transpose()
}
