// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and handed to every service that needs it.

use std::env;

const DEFAULT_REFRESH_LEEWAY_SECS: i64 = 30;
/// Upper bound accepted for `REFRESH_LEEWAY_SECS`.
pub const MAX_REFRESH_LEEWAY_SECS: i64 = 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Keycloak realm issuer URL (e.g. `https://sso.example.com/realms/video`)
    pub identity_issuer: String,
    /// OIDC client ID (public)
    pub identity_client_id: String,
    /// Base URL of the remote video API
    pub api_url: String,
    /// Frontend URL for post-login redirects and CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Refresh access tokens this many seconds before they expire
    pub refresh_leeway_secs: i64,
    /// Largest upload body accepted by `/api/uploads`
    pub max_upload_bytes: usize,

    // --- Secrets ---
    /// OIDC client secret
    pub identity_client_secret: String,
    /// Key for session JWTs and OAuth state signatures (raw bytes)
    pub session_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            identity_issuer: "http://localhost:8180/realms/video".to_string(),
            identity_client_id: "test_client_id".to_string(),
            api_url: "http://localhost:3001".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            refresh_leeway_secs: DEFAULT_REFRESH_LEEWAY_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            identity_client_secret: "test_secret".to_string(),
            session_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

impl Config {
    /// Configuration used by tests; identical to `Default`.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            identity_issuer: env::var("KEYCLOAK_ISSUER")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("KEYCLOAK_ISSUER"))?,
            identity_client_id: env::var("KEYCLOAK_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("KEYCLOAK_CLIENT_ID"))?,
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("API_URL"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            refresh_leeway_secs: check_leeway(parse_or(
                "REFRESH_LEEWAY_SECS",
                DEFAULT_REFRESH_LEEWAY_SECS,
            )?)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,

            identity_client_secret: env::var("KEYCLOAK_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("KEYCLOAK_CLIENT_SECRET"))?,
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn check_leeway(secs: i64) -> Result<i64, ConfigError> {
    if (0..=MAX_REFRESH_LEEWAY_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError::Invalid("REFRESH_LEEWAY_SECS"))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
