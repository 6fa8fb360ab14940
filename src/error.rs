// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The identity provider rejected the code exchange (or was unreachable).
    #[error("Authorization with identity provider failed: {0}")]
    UpstreamAuthFailure(String),

    /// A credential was issued but the user profile could not be fetched.
    #[error("Failed to fetch user profile: {0}")]
    ProfileFetchFailure(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Any other remote calendar failure. `context` is user-visible, `cause` is not.
    #[error("{context}: {cause}")]
    RemoteError { context: &'static str, cause: String },

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable message shown for `Unauthenticated`.
    pub const UNAUTHORIZED_MESSAGE: &'static str = "Unauthorized";

    /// True for failures that happen during the OAuth dance.
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamAuthFailure(_) | AppError::ProfileFetchFailure(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, error) = match &self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Self::UNAUTHORIZED_MESSAGE.to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), Some("not_found")),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), Some("bad_request"))
            }
            AppError::RemoteError { context, cause } => {
                tracing::error!(error = %cause, "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    context.to_string(),
                    Some("remote_error"),
                )
            }
            AppError::UpstreamAuthFailure(msg) => {
                tracing::warn!(error = %msg, "Identity provider rejected authorization");
                (
                    StatusCode::BAD_GATEWAY,
                    "Authorization failed".to_string(),
                    Some("upstream_auth_failure"),
                )
            }
            AppError::ProfileFetchFailure(msg) => {
                tracing::warn!(error = %msg, "Profile fetch failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to fetch user profile".to_string(),
                    Some("profile_fetch_failure"),
                )
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Session store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Session storage unavailable".to_string(),
                    Some("store_error"),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some("internal_error"),
                )
            }
        };

        (status, Json(ErrorResponse { message, error })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
