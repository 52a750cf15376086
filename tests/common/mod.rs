// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::response::Response;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::sync::Arc;
use vidboard::config::Config;
use vidboard::middleware::auth::create_jwt;
use vidboard::models::TokenResponse;
use vidboard::routes::create_router;
use vidboard::services::{IdentityClient, SessionTokenManager};
use vidboard::AppState;

/// Realm path the identity mocks are mounted under.
#[allow(dead_code)]
pub const REALM: &str = "/realms/test";

/// Token endpoint path under the mock identity server.
#[allow(dead_code)]
pub const TOKEN_PATH: &str = "/realms/test/protocol/openid-connect/token";

/// An unsigned identity assertion carrying `sub`.
#[allow(dead_code)]
pub fn id_token(sub: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}","email":"{}@example.com"}}"#, sub, sub))
    )
}

/// Initial token grant as returned by the code exchange.
#[allow(dead_code)]
pub fn initial_grant(sub: &str, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: "access-1".to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_in,
        id_token: Some(id_token(sub)),
    }
}

/// Config pointing at mock identity and video API servers.
#[allow(dead_code)]
pub fn test_config(identity_base: &str, api_url: &str) -> Config {
    Config {
        identity_issuer: format!("{}{}", identity_base, REALM),
        api_url: api_url.to_string(),
        ..Config::test_default()
    }
}

/// Create a test app. Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    (create_router(state.clone()), state)
}

/// Register a signed-in session and return its `Cookie` header value.
#[allow(dead_code)]
pub async fn signed_in_cookie(state: &AppState, sub: &str, expires_in: i64) -> (String, String) {
    let (session_id, subject_id) = state
        .sessions
        .create(initial_grant(sub, expires_in))
        .await
        .expect("session should be created");
    let jwt = create_jwt(&session_id, &subject_id, &state.config.session_signing_key)
        .expect("jwt should encode");
    (format!("vidboard_session={}", jwt), session_id)
}

/// A signed-in token manager talking to `identity_base`.
#[allow(dead_code)]
pub async fn signed_in_manager(identity_base: &str, expires_in: i64) -> SessionTokenManager {
    let identity = IdentityClient::new(
        &format!("{}{}", identity_base, REALM),
        "test_client_id".to_string(),
        "test_secret".to_string(),
    );
    let manager = SessionTokenManager::new(identity, 30);
    manager
        .sign_in(initial_grant("user-1", expires_in))
        .await
        .expect("sign in should succeed");
    manager
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
