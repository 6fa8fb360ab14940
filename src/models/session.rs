// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity, credential and session models.
//!
//! `Identity` is safe to serialize to the browser. `Credential` holds secret
//! material and deliberately implements neither `Serialize` nor a revealing
//! `Debug`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of random bytes in a session id.
const SESSION_ID_BYTES: usize = 32;

/// The authenticated end user as known by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Identity {
    /// Provider-issued subject id (stable across logins)
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    /// Raw profile payload as returned by the provider
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub profile: serde_json::Value,
}

/// Delegated-access token bound to an identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    refresh_token: Option<String>,
    pub scopes: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        scopes: Vec<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            scopes,
            issued_at,
        }
    }

    /// Access token for server-side calls only.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("scopes", &self.scopes)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Opaque, unguessable session identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session id (256 bits from the system CSPRNG).
    pub fn generate() -> anyhow::Result<Self> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("System RNG failure"))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Wrap an id received from a verified cookie.
    pub fn from_verified(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a short prefix, enough to correlate log lines.
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}…)")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the credential store holds for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBinding {
    pub identity: Identity,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
}
