//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use chrono::Duration;
use edumynt_core::token::DEFAULT_REFRESH_MARGIN_SECS;
use tracing::Level;

use crate::session::registry::DEFAULT_IDLE_TIMEOUT;

pub const DEFAULT_COOKIE_NAME: &str = "edumynt-auth-token";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs against the in-memory demo catalog.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Public origin of the site, used for password-reset links and CORS.
    pub site_url: String,
    pub refresh_margin: Duration,
    /// How long an unused client slot is kept before it is swept.
    pub session_idle_timeout: std::time::Duration,
    pub cookie_name: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Hosted Backend ---
        let supabase_url = var("SUPABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("SUPABASE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let supabase_anon_key = var("SUPABASE_ANON_KEY")
            .ok_or_else(|| ConfigError::MissingVar("SUPABASE_ANON_KEY".to_string()))?;

        let site_url = var("SITE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Session Settings ---
        let refresh_margin = match var("SESSION_REFRESH_MARGIN_SECS") {
            Some(raw) => {
                let secs = raw.parse::<i64>().ok().filter(|s| *s >= 0).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_REFRESH_MARGIN_SECS".to_string(),
                        format!("'{}' is not a non-negative number of seconds", raw),
                    )
                })?;
                Duration::seconds(secs)
            }
            None => Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        };
        let session_idle_timeout = match var("SESSION_IDLE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    )
                })?;
                std::time::Duration::from_secs(secs)
            }
            None => DEFAULT_IDLE_TIMEOUT,
        };
        let cookie_name =
            var("SESSION_COOKIE_NAME").unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            supabase_url,
            supabase_anon_key,
            site_url,
            refresh_margin,
            session_idle_timeout,
            cookie_name,
        })
    }

    /// Where password-reset emails send the user back to.
    pub fn password_reset_redirect(&self) -> String {
        format!("{}/auth/reset-password", self.site_url)
    }
}
