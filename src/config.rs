//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required to serve): HMAC secret used to sign access and refresh tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `ACCESS_TOKEN_TTL_MINUTES` (optional): access token lifetime, defaults to 60
/// - `REFRESH_TOKEN_TTL_DAYS` (optional): refresh token lifetime, defaults to 7
/// - `CORS_ALLOWED_ORIGINS` (optional): comma separated origins, empty allows any
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    /// Empty for CLI-only runs; `serve` refuses to start without it.
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: i64,

    #[serde(default)]
    pub cors_allowed_origins: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_ttl() -> i64 {
    60
}

fn default_refresh_ttl() -> i64 {
    7
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// The token signing secret, `None` when unset or blank.
    pub fn signing_secret(&self) -> Option<&str> {
        Some(self.jwt_secret.trim()).filter(|secret| !secret.is_empty())
    }

    /// Origins listed in `CORS_ALLOWED_ORIGINS`, trimmed, blanks dropped.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}
