//! API configuration.

use tiller_core::config::JwtSettings;
use tiller_core::password;

/// Configuration for the API surface, sourced from environment variables.
///
/// | Field | Env var | Default |
/// |---|---|---|
/// | `bind_addr` | `BIND_ADDR` | `127.0.0.1:8000` |
/// | `database_url` | `DATABASE_URL` | `sqlite://tiller.db?mode=rwc` |
/// | `service_name` | `SERVICE_NAME` | `tiller_` |
/// | `bcrypt_cost` | `BCRYPT_COST` | `10` |
/// | `jwt` | `JWT_*` | see [`JwtSettings`] |
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen address.
    pub bind_addr: String,
    /// Database connection URL.
    pub database_url: String,
    /// Prefix for RPC queue names; carries its own separator.
    pub service_name: String,
    /// bcrypt work factor for password hashing.
    pub bcrypt_cost: u32,
    /// Token issuing settings.
    pub jwt: JwtSettings,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tiller.db?mode=rwc".to_string()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "tiller_".to_string()),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(password::DEFAULT_COST),
            jwt: JwtSettings::from_env(),
        }
    }
}
