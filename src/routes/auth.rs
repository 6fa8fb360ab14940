// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::redirect_found;
use crate::error::{AppError, Result};
use crate::middleware::session::{self, RequestContext};
use crate::models::SessionId;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/logout", get(logout))
}

/// Start OAuth flow - redirect to Google authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Response> {
    let auth_url = state.identity_broker.begin_authorization()?;
    Ok(redirect_found(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, bind the session, set the cookie.
///
/// Failures never show an error page: the browser is sent back to the
/// frontend login page with `authError=true`.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    match complete_login(&state, &context, params).await {
        Ok(session_id) => {
            let jar = session::issue(jar, &session_id, &state.config.session_secret);
            (jar, redirect_found(&state.config.frontend_url)).into_response()
        }
        Err(e) => {
            if e.is_login_failure() {
                tracing::warn!(error = %e, "Login failed");
            } else {
                tracing::error!(error = %e, "Login failed on our side");
            }
            redirect_found(&format!("{}/login?authError=true", state.config.frontend_url))
        }
    }
}

async fn complete_login(
    state: &AppState,
    context: &RequestContext,
    params: CallbackParams,
) -> Result<SessionId> {
    // Check for OAuth errors (e.g. the user declined consent)
    if let Some(error) = params.error {
        return Err(AppError::UpstreamAuthFailure(format!(
            "Provider returned error: {}",
            error
        )));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::UpstreamAuthFailure("Missing OAuth state".to_string()))?;
    state.identity_broker.verify_state(&oauth_state)?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::UpstreamAuthFailure("Missing authorization code".to_string()))?;

    let (identity, credential) = state.identity_broker.complete_authorization(&code).await?;

    // Always mint a fresh id; drop whatever session the browser carried.
    if let Some(previous) = context.session_id() {
        if let Err(e) = state.store.unbind(previous).await {
            tracing::warn!(error = %e, "Failed to drop previous session, continuing anyway");
        }
    }

    let session_id = SessionId::generate()?;
    let subject = identity.id.clone();
    state.store.bind(&session_id, identity, credential).await?;

    tracing::info!(subject = %subject, session = %session_id, "Session created");
    Ok(session_id)
}

/// Logout - unbind the session and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    jar: CookieJar,
) -> Response {
    let (jar, result) = session::terminate(state.store.as_ref(), &context, jar).await;

    let target = match result {
        Ok(()) => format!("{}/login", state.config.frontend_url),
        Err(e) => {
            tracing::error!(error = %e, "Error during logout");
            format!("{}/?logoutError=true", state.config.frontend_url)
        }
    };

    (jar, redirect_found(&target)).into_response()
}
