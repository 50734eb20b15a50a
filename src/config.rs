//! Configuration loader for the `stormsight` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Base URL of the external predictive storm source.
    pub prediction_api_url: String,

    /// URL of the push notification gateway (the delivery transport).
    pub push_gateway_url: String,

    /// Per-attempt push delivery timeout in seconds.
    pub push_timeout_secs: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `PREDICTION_API_URL` – predictive storm source base URL
/// - `PUSH_GATEWAY_URL` – push notification gateway URL
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `PUSH_TIMEOUT_SECS` – per-attempt delivery timeout (default: 10)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let prediction_api_url = require_env!("PREDICTION_API_URL");
    let push_gateway_url = require_env!("PUSH_GATEWAY_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let push_timeout_secs = parse_env_u32!("PUSH_TIMEOUT_SECS", 10);

    Ok(Config {
        db_url,
        db_pool_max,
        prediction_api_url,
        push_gateway_url,
        push_timeout_secs,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL       : {}", masked_db_url);
        tracing::info!("  PREDICTION_API_URL : {}", self.prediction_api_url);
        tracing::info!("  PUSH_GATEWAY_URL   : {}", self.push_gateway_url);
        tracing::info!("  DB_POOL_MAX        : {}", self.db_pool_max);
        tracing::info!("  PUSH_TIMEOUT_SECS  : {}", self.push_timeout_secs);
    }
}
