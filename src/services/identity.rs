// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity broker: Google OAuth 2.0 authorization-code flow.
//!
//! Two steps:
//! - [`IdentityBroker::begin_authorization`] builds the consent URL (no I/O).
//! - [`IdentityBroker::complete_authorization`] exchanges the code and fetches
//!   the profile, producing an [`Identity`] and a separate [`Credential`].
//!
//! The `state` parameter is an HMAC-signed, timestamped nonce, so nothing has
//! to be persisted between the two steps.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Credential, Identity};
use crate::services::signing;

/// Scopes requested at consent time.
pub const SCOPES: [&str; 3] = [
    "profile",
    "email",
    "https://www.googleapis.com/auth/calendar",
];

/// How long a signed OAuth state stays valid.
const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;
/// Tolerated clock skew for states issued "in the future".
const STATE_CLOCK_SKEW_MS: i64 = 60 * 1000;
const STATE_NONCE_BYTES: usize = 16;

/// Google OAuth client.
#[derive(Clone)]
pub struct IdentityBroker {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    state_key: Vec<u8>,
}

impl IdentityBroker {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            callback_url: config.google_callback_url.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            userinfo_url: config.google_userinfo_url.clone(),
            state_key: config.session_secret.clone(),
        }
    }

    // ─── Step 1: Redirect ───────────────────────────────────────────────────

    /// Build the provider authorization URL with a fresh signed state.
    pub fn begin_authorization(&self) -> Result<String, AppError> {
        let state = self.issue_state(chrono::Utc::now().timestamp_millis())?;

        let auth_url = format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             include_granted_scopes=true&\
             state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(&SCOPES.join(" ")),
            state
        );

        tracing::info!(client_id = %self.client_id, "Starting OAuth flow, redirecting to Google");
        Ok(auth_url)
    }

    /// Create a state token: base64("nonce_hex|timestamp_hex|signature_hex").
    fn issue_state(&self, now_ms: i64) -> Result<String, AppError> {
        let mut nonce = [0u8; STATE_NONCE_BYTES];
        SystemRandom::new()
            .fill(&mut nonce)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

        let payload = format!("{}|{:x}", hex::encode(nonce), now_ms);
        let signature = signing::sign(&self.state_key, &payload);
        Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
    }

    /// Check that `state` was issued by us and has not expired.
    pub fn verify_state(&self, state: &str) -> Result<(), AppError> {
        self.verify_state_at(state, chrono::Utc::now().timestamp_millis())
    }

    fn verify_state_at(&self, state: &str, now_ms: i64) -> Result<(), AppError> {
        let invalid = || AppError::UpstreamAuthFailure("Invalid OAuth state".to_string());

        let bytes = URL_SAFE_NO_PAD.decode(state).map_err(|_| invalid())?;
        let state_str = String::from_utf8(bytes).map_err(|_| invalid())?;

        let parts: Vec<&str> = state_str.splitn(3, '|').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let (nonce_hex, timestamp_hex, signature_hex) = (parts[0], parts[1], parts[2]);

        let payload = format!("{}|{}", nonce_hex, timestamp_hex);
        if !signing::verify(&self.state_key, &payload, signature_hex) {
            tracing::error!("OAuth state signature mismatch! Potential tampering.");
            return Err(invalid());
        }

        let issued_ms = i64::from_str_radix(timestamp_hex, 16).map_err(|_| invalid())?;
        let age = now_ms - issued_ms;
        if age > STATE_MAX_AGE_MS || age < -STATE_CLOCK_SKEW_MS {
            tracing::warn!(age_ms = age, "OAuth state expired");
            return Err(AppError::UpstreamAuthFailure(
                "OAuth state expired".to_string(),
            ));
        }

        Ok(())
    }

    // ─── Step 2: Callback ───────────────────────────────────────────────────

    /// Exchange an authorization code for a credential and the user's identity.
    ///
    /// A stale or reused code is rejected by the provider and surfaces as
    /// `UpstreamAuthFailure`; no earlier session is ever reused.
    pub async fn complete_authorization(
        &self,
        code: &str,
    ) -> Result<(Identity, Credential), AppError> {
        tracing::info!("Exchanging authorization code for tokens");

        let tokens = self.exchange_code(code).await?;
        let scopes = match tokens.scope.as_deref() {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        let credential = Credential::new(
            tokens.access_token,
            tokens.refresh_token,
            scopes,
            chrono::Utc::now(),
        );

        let identity = self.fetch_profile(credential.access_token()).await?;

        tracing::info!(
            subject = %identity.id,
            has_refresh_token = credential.has_refresh_token(),
            "OAuth successful"
        );
        Ok((identity, credential))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamAuthFailure(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::UpstreamAuthFailure(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamAuthFailure(format!("Failed to parse token response: {}", e))
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ProfileFetchFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ProfileFetchFailure(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::ProfileFetchFailure(format!("JSON parse error: {}", e)))?;

        identity_from_profile(raw)
    }
}

/// Token exchange response from Google.
#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Subset of the OpenID Connect userinfo document we rely on.
#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
}

/// Build a normalized identity from the raw userinfo payload.
fn identity_from_profile(raw: serde_json::Value) -> Result<Identity, AppError> {
    let info: UserInfo = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::ProfileFetchFailure(format!("Unexpected profile shape: {}", e)))?;

    if info.sub.is_empty() {
        return Err(AppError::ProfileFetchFailure(
            "Profile has no subject id".to_string(),
        ));
    }

    let display_name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            let joined = [info.given_name.as_deref(), info.family_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
        .or_else(|| info.email.clone())
        .unwrap_or_else(|| info.sub.clone());

    Ok(Identity {
        id: info.sub,
        display_name,
        email: info.email,
        profile: raw,
    })
}
