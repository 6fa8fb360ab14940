// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Response};
use axum::Router;
use calendar_gateway::config::Config;
use calendar_gateway::middleware::session::{session_cookie_value, SESSION_COOKIE};
use calendar_gateway::models::{Credential, Identity, SessionId};
use calendar_gateway::routes::create_router;
use calendar_gateway::store::{CredentialStore, MemoryCredentialStore, SharedCredentialStore};
use calendar_gateway::AppState;
use std::sync::Arc;

/// Access token handed out by [`sign_in`].
#[allow(dead_code)]
pub const TEST_ACCESS_TOKEN: &str = "ya29.test-access-token";

/// Router plus handles to inspect its state.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryCredentialStore>,
}

/// Create a test app whose Google endpoints are unreachable defaults.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app whose Google endpoints all live under `base`.
#[allow(dead_code)]
pub fn create_test_app_with_provider(base: &str) -> TestApp {
    create_test_app_with_config(Config::test_default().with_provider_base(base))
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(MemoryCredentialStore::new());
    let state = Arc::new(AppState::new(config, store.clone()));
    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

/// Create a test app around an arbitrary store implementation.
#[allow(dead_code)]
pub fn create_test_app_with_store(config: Config, store: SharedCredentialStore) -> Router {
    create_router(Arc::new(AppState::new(config, store)))
}

#[allow(dead_code)]
pub fn test_identity() -> Identity {
    Identity {
        id: "110248495921238986420".to_string(),
        display_name: "Ada Lovelace".to_string(),
        email: Some("ada@example.com".to_string()),
        profile: serde_json::json!({
            "sub": "110248495921238986420",
            "name": "Ada Lovelace",
            "email": "ada@example.com"
        }),
    }
}

/// Bind a session directly in the store and return `(id, Cookie header)`.
#[allow(dead_code)]
pub async fn sign_in(app: &TestApp) -> (SessionId, String) {
    let session_id = SessionId::generate().unwrap();
    let credential = Credential::new(
        TEST_ACCESS_TOKEN.to_string(),
        Some("1//refresh".to_string()),
        vec!["https://www.googleapis.com/auth/calendar".to_string()],
        chrono::Utc::now(),
    );
    app.store
        .bind(&session_id, test_identity(), credential)
        .await
        .unwrap();
    let cookie = cookie_header(&session_id, &app.state.config.session_secret);
    (session_id, cookie)
}

#[allow(dead_code)]
pub fn cookie_header(session_id: &SessionId, secret: &[u8]) -> String {
    format!(
        "{}={}",
        SESSION_COOKIE,
        session_cookie_value(session_id, secret)
    )
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub fn set_cookie_headers<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
