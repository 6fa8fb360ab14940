// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie middleware.
//!
//! The cookie carries `<session id>.<hmac>`; the binding itself lives in the
//! credential store. Every request gets a [`RequestContext`] extension,
//! populated when the cookie verifies and resolves, empty otherwise.

use crate::error::AppError;
use crate::models::{Credential, Identity, SessionBinding, SessionId};
use crate::services::signing;
use crate::store::{CredentialStore, StoreError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "calendar_sid";

/// Per-request authentication state, passed explicitly to handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session_id: Option<SessionId>,
    binding: Option<Arc<SessionBinding>>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(session_id: SessionId, binding: Arc<SessionBinding>) -> Self {
        Self {
            session_id: Some(session_id),
            binding: Some(binding),
        }
    }

    /// Session id from a correctly signed cookie, even if it no longer resolves.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.binding.as_deref().map(|b| &b.identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.binding.is_some()
    }

    /// Gate for every calendar operation.
    pub fn require_authenticated(&self) -> Result<&Credential, AppError> {
        self.binding
            .as_deref()
            .map(|b| &b.credential)
            .ok_or(AppError::Unauthenticated)
    }

    pub fn require_identity(&self) -> Result<&Identity, AppError> {
        self.identity().ok_or(AppError::Unauthenticated)
    }
}

/// Middleware that attaches a [`RequestContext`] to every request.
///
/// Never rejects: gating happens in the operations that need a credential.
pub async fn authenticate_request(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_value = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let context = authenticate(
        state.store.as_ref(),
        &state.config.session_secret,
        cookie_value.as_deref(),
    )
    .await;

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Resolve a raw cookie value into a request context.
pub async fn authenticate(
    store: &dyn CredentialStore,
    secret: &[u8],
    cookie_value: Option<&str>,
) -> RequestContext {
    let Some(session_id) = cookie_value.and_then(|v| verify_session_cookie(v, secret)) else {
        if cookie_value.is_some() {
            tracing::debug!("Ignoring session cookie with bad signature");
        }
        return RequestContext::anonymous();
    };

    let binding = match store.resolve(&session_id).await {
        Ok(binding) => binding,
        Err(e) => {
            tracing::error!(error = %e, session = %session_id, "Session lookup failed");
            None
        }
    };

    RequestContext {
        session_id: Some(session_id),
        binding: binding.map(Arc::new),
    }
}

/// Cookie value for `session_id`: `<id>.<hex hmac>`.
pub fn session_cookie_value(session_id: &SessionId, secret: &[u8]) -> String {
    format!(
        "{}.{}",
        session_id.as_str(),
        signing::sign(secret, session_id.as_str())
    )
}

/// Check the signature on a cookie value and return the session id.
pub fn verify_session_cookie(value: &str, secret: &[u8]) -> Option<SessionId> {
    let (id, signature) = value.rsplit_once('.')?;
    if id.is_empty() || !signing::verify(secret, id, signature) {
        return None;
    }
    Some(SessionId::from_verified(id))
}

/// Add the session cookie to the jar.
///
/// `HttpOnly` and `SameSite=Lax` so the provider's cross-site redirect back
/// still carries it. Not `Secure`: deployments behind TLS must add that.
pub fn issue(jar: CookieJar, session_id: &SessionId, secret: &[u8]) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session_cookie_value(session_id, secret)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Remove the session cookie (same path it was issued with).
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// End the session: unbind it from the store, then clear the cookie.
///
/// The cookie is cleared even when there was nothing to unbind or the store
/// failed; the store result is returned for the caller to report.
pub async fn terminate(
    store: &dyn CredentialStore,
    context: &RequestContext,
    jar: CookieJar,
) -> (CookieJar, Result<(), StoreError>) {
    let result = match context.session_id() {
        Some(session_id) => {
            let result = store.unbind(session_id).await;
            if result.is_ok() {
                tracing::info!(session = %session_id, "Session terminated");
            }
            result
        }
        None => Ok(()),
    };
    (clear(jar), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    const SECRET: &[u8] = b"test_session_secret_32_bytes_min!";

    fn binding() -> (Identity, Credential) {
        (
            Identity {
                id: "sub-1".to_string(),
                display_name: "Test".to_string(),
                email: None,
                profile: serde_json::json!({}),
            },
            Credential::new("token".to_string(), None, vec![], chrono::Utc::now()),
        )
    }

    #[test]
    fn test_cookie_value_round_trip() {
        let id = SessionId::generate().unwrap();
        let value = session_cookie_value(&id, SECRET);
        assert_eq!(verify_session_cookie(&value, SECRET), Some(id));
    }

    #[test]
    fn test_cookie_value_rejects_tampering() {
        let id = SessionId::generate().unwrap();
        let value = session_cookie_value(&id, SECRET);
        let other = SessionId::generate().unwrap();
        let (_, sig) = value.rsplit_once('.').unwrap();

        assert!(verify_session_cookie(&format!("{}.{}", other.as_str(), sig), SECRET).is_none());
        assert!(verify_session_cookie(&value, b"another_secret_of_32_bytes_long!!").is_none());
        assert!(verify_session_cookie(id.as_str(), SECRET).is_none());
        assert!(verify_session_cookie("", SECRET).is_none());
    }

    #[test]
    fn test_require_authenticated_on_empty_context() {
        let ctx = RequestContext::anonymous();
        assert!(matches!(
            ctx.require_authenticated(),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(ctx.require_identity(), Err(AppError::Unauthenticated)));
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_without_cookie_is_anonymous() {
        let store = MemoryCredentialStore::new();
        let ctx = authenticate(&store, SECRET, None).await;
        assert!(ctx.session_id().is_none());
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_resolves_bound_session() {
        let store = MemoryCredentialStore::new();
        let id = SessionId::generate().unwrap();
        let (identity, credential) = binding();
        store.bind(&id, identity, credential).await.unwrap();

        let value = session_cookie_value(&id, SECRET);
        let ctx = authenticate(&store, SECRET, Some(&value)).await;
        assert_eq!(ctx.identity().unwrap().id, "sub-1");
        assert_eq!(ctx.require_authenticated().unwrap().access_token(), "token");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_session_keeps_id_only() {
        let store = MemoryCredentialStore::new();
        let id = SessionId::generate().unwrap();
        let value = session_cookie_value(&id, SECRET);

        let ctx = authenticate(&store, SECRET, Some(&value)).await;
        assert_eq!(ctx.session_id(), Some(&id));
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn test_terminate_unbinds_and_clears_cookie() {
        let store = MemoryCredentialStore::new();
        let id = SessionId::generate().unwrap();
        let (identity, credential) = binding();
        store.bind(&id, identity, credential).await.unwrap();

        let value = session_cookie_value(&id, SECRET);
        let ctx = authenticate(&store, SECRET, Some(&value)).await;
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, value.clone()));

        let (jar, result) = terminate(&store, &ctx, jar).await;
        assert!(result.is_ok());
        assert!(jar.get(SESSION_COOKIE).is_none());
        assert!(store.resolve(&id).await.unwrap().is_none());

        // A second logout with the same (now unbound) cookie still succeeds.
        let ctx = authenticate(&store, SECRET, Some(&value)).await;
        let (_, result) = terminate(&store, &ctx, CookieJar::new()).await;
        assert!(result.is_ok());
    }
}
