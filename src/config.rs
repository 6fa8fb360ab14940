// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. Provider endpoints can be overridden so
//! tests (and staging deployments) can point the service at a stub server.

use std::env;
use std::fmt;

/// Google OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google OpenID Connect userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
/// Google Calendar API v3 base URL.
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Minimum length of the session signing secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_CALLBACK_URL: &str = "http://localhost:5001/auth/google/callback";

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Absolute callback URL registered with Google
    pub google_callback_url: String,
    /// Frontend origin, used for CORS and post-login redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Provider endpoints ---
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
    pub calendar_api_base: String,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for session cookies and OAuth state (raw bytes)
    pub session_secret: Vec<u8>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("google_client_id", &self.google_client_id)
            .field("google_callback_url", &self.google_callback_url)
            .field("frontend_url", &self.frontend_url)
            .field("port", &self.port)
            .field("google_auth_url", &self.google_auth_url)
            .field("google_token_url", &self.google_token_url)
            .field("google_userinfo_url", &self.google_userinfo_url)
            .field("calendar_api_base", &self.calendar_api_base)
            .field("google_client_secret", &"[redacted]")
            .field("session_secret", &"[redacted]")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?
            .into_bytes();
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET",
                format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            ));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", format!("not a port number: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_callback_url: env_or("GOOGLE_CALLBACK_URL", DEFAULT_CALLBACK_URL),
            frontend_url: env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL)
                .trim_end_matches('/')
                .to_string(),
            port,
            google_auth_url: env_or("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
            google_token_url: env_or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
            google_userinfo_url: env_or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
            calendar_api_base: env_or("GOOGLE_CALENDAR_API_BASE", GOOGLE_CALENDAR_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            session_secret,
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_callback_url: "http://localhost:5001/auth/google/callback".to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: DEFAULT_PORT,
            google_auth_url: GOOGLE_AUTH_URL.to_string(),
            google_token_url: GOOGLE_TOKEN_URL.to_string(),
            google_userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            calendar_api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
            google_client_secret: "test_secret".to_string(),
            session_secret: b"test_session_secret_32_bytes_min!".to_vec(),
        }
    }

    /// Point every Google endpoint at `base` (a stub server in tests).
    pub fn with_provider_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.google_auth_url = format!("{base}/o/oauth2/v2/auth");
        self.google_token_url = format!("{base}/token");
        self.google_userinfo_url = format!("{base}/oauth2/v3/userinfo");
        self.calendar_api_base = format!("{base}/calendar/v3");
        self
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
