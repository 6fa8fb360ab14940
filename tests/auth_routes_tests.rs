// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and logout flow tests against a stub Google OAuth provider.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use calendar_gateway::config::Config;
use calendar_gateway::models::{Credential, Identity, SessionBinding, SessionId};
use calendar_gateway::store::{CredentialStore, StoreError};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{
    body_json, cookie_header, create_test_app, create_test_app_with_provider,
    create_test_app_with_store, location, set_cookie_headers, sign_in, TestApp,
};

const FRONTEND: &str = "http://localhost:5173";

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| urlencoding::decode(v).unwrap().into_owned())
    })
}

/// `name=value` part of the session Set-Cookie header, usable as a Cookie header.
fn session_cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

async fn mount_provider(server: &MockServer, code: &str, access_token: &str, sub: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("code={}", code)))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "scope": "openid https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oauth2/v3/userinfo"))
        .and(header_matcher(
            "authorization",
            format!("Bearer {}", access_token).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": sub,
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "picture": "https://example.com/ada.png"
        })))
        .mount(server)
        .await;
}

/// Hit `/auth/google` and return the signed state from the redirect.
async fn start_login(app: &TestApp) -> String {
    let response = app
        .router
        .clone()
        .oneshot(get("/auth/google", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    query_param(&location(&response), "state").expect("state in redirect")
}

#[tokio::test]
async fn test_auth_google_redirects_to_consent() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/auth/google", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response);
    assert!(target.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert_eq!(
        query_param(&target, "scope").as_deref(),
        Some("profile email https://www.googleapis.com/auth/calendar")
    );
    assert_eq!(
        query_param(&target, "client_id").as_deref(),
        Some("test-client-id.apps.googleusercontent.com")
    );
    assert!(set_cookie_headers(&response).is_empty());
}

#[tokio::test]
async fn test_full_login_sets_cookie_and_enables_me() {
    let server = MockServer::start().await;
    mount_provider(&server, "good-code", "ya29.fresh", "sub-42").await;
    let app = create_test_app_with_provider(&server.uri());

    let state = start_login(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(get(
            &format!(
                "/auth/google/callback?code=good-code&state={}",
                urlencoding::encode(&state)
            ),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), FRONTEND);

    let cookies = set_cookie_headers(&response);
    assert_eq!(cookies.len(), 1);
    let set_cookie = &cookies[0];
    assert!(set_cookie.starts_with("calendar_sid="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("Secure"));
    assert_eq!(app.store.len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(get("/me", Some(&session_cookie_pair(set_cookie))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "sub-42");
    assert_eq!(body["displayName"], "Ada Lovelace");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["profile"]["picture"], "https://example.com/ada.png");
    assert!(!body.to_string().contains("ya29.fresh"));
    assert!(!body.to_string().contains("1//refresh"));
}

#[tokio::test]
async fn test_stale_code_redirects_with_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = create_test_app_with_provider(&server.uri());

    let state = start_login(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(get(
            &format!(
                "/auth/google/callback?code=used-code&state={}",
                urlencoding::encode(&state)
            ),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/login?authError=true", FRONTEND)
    );
    assert!(set_cookie_headers(&response).is_empty());
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_profile_failure_redirects_with_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "ya29.x"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/userinfo"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let app = create_test_app_with_provider(&server.uri());

    let state = start_login(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(get(
            &format!(
                "/auth/google/callback?code=c&state={}",
                urlencoding::encode(&state)
            ),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/login?authError=true", FRONTEND)
    );
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_forged_state_never_reaches_token_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = create_test_app_with_provider(&server.uri());

    for query in [
        "code=abc",
        "code=abc&state=bm90LWEtcmVhbC1zdGF0ZQ",
        "code=abc&state=",
    ] {
        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/auth/google/callback?{}", query), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            format!("{}/login?authError=true", FRONTEND)
        );
    }
}

#[tokio::test]
async fn test_declined_consent_redirects_with_auth_error() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = create_test_app_with_provider(&server.uri());

    let state = start_login(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(get(
            &format!(
                "/auth/google/callback?error=access_denied&state={}",
                urlencoding::encode(&state)
            ),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/login?authError=true", FRONTEND)
    );
}

#[tokio::test]
async fn test_relogin_rotates_session_id() {
    let server = MockServer::start().await;
    mount_provider(&server, "second-code", "ya29.second", "110248495921238986420").await;
    let app = create_test_app_with_provider(&server.uri());
    let (old_id, old_cookie) = sign_in(&app).await;

    let state = start_login(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(get(
            &format!(
                "/auth/google/callback?code=second-code&state={}",
                urlencoding::encode(&state)
            ),
            Some(&old_cookie),
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), FRONTEND);
    let cookies = set_cookie_headers(&response);
    assert_eq!(cookies.len(), 1);
    let new_cookie = session_cookie_pair(&cookies[0]);
    assert_ne!(new_cookie, old_cookie);

    // Old session is gone, new one works.
    assert!(app.store.resolve(&old_id).await.unwrap().is_none());
    assert_eq!(app.store.len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(get("/me", Some(&old_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(get("/me", Some(&new_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_unbinds_and_clears_cookie() {
    let app = create_test_app();
    let (session_id, cookie) = sign_in(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/auth/logout", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("{}/login", FRONTEND));
    let cookies = set_cookie_headers(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("calendar_sid="));
    assert!(cookies[0].contains("Max-Age=0"));

    assert!(app.store.resolve(&session_id).await.unwrap().is_none());

    // Replaying the old cookie no longer authenticates.
    let response = app
        .router
        .clone()
        .oneshot(get("/me", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_still_redirects() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(get("/auth/logout", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("{}/login", FRONTEND));
}

/// Store whose writes always fail.
struct UnavailableStore;

#[async_trait]
impl CredentialStore for UnavailableStore {
    async fn bind(
        &self,
        _session_id: &SessionId,
        _identity: Identity,
        _credential: Credential,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn resolve(&self, _session_id: &SessionId) -> Result<Option<SessionBinding>, StoreError> {
        Ok(None)
    }

    async fn unbind(&self, _session_id: &SessionId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_logout_store_failure_redirects_with_logout_error() {
    let config = Config::test_default();
    let cookie = cookie_header(&SessionId::generate().unwrap(), &config.session_secret);
    let router = create_test_app_with_store(config, Arc::new(UnavailableStore));

    let response = router
        .oneshot(get("/auth/logout", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("{}/?logoutError=true", FRONTEND));
    let cookies = set_cookie_headers(&response);
    assert!(cookies.iter().any(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_login_store_failure_redirects_with_auth_error() {
    let server = MockServer::start().await;
    mount_provider(&server, "good-code", "ya29.fresh", "sub-42").await;
    let config = Config::test_default().with_provider_base(&server.uri());
    let router = create_test_app_with_store(config, Arc::new(UnavailableStore));

    let response = router
        .clone()
        .oneshot(get("/auth/google", None))
        .await
        .unwrap();
    let state = query_param(&location(&response), "state").unwrap();

    let response = router
        .oneshot(get(
            &format!(
                "/auth/google/callback?code=good-code&state={}",
                urlencoding::encode(&state)
            ),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}/login?authError=true", FRONTEND)
    );
    assert!(set_cookie_headers(&response).is_empty());
}
