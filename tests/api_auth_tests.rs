// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without a live session
//! 2. Protected routes accept requests with a live session
//! 3. A session whose refresh fails is dropped and its cookie cleared
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use vidboard::config::Config;
use vidboard::middleware::auth::create_jwt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{body_json, create_test_app, set_cookie_headers, signed_in_cookie, test_config};

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/videos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/videos")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_jwt_for_unknown_session_is_rejected() {
    let config = Config::test_default();
    let jwt = create_jwt("no-such-session", "user-1", &config.session_signing_key).unwrap();
    let (app, _) = create_test_app(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/session")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_info_with_cookie() {
    let (app, state) = create_test_app(Config::test_default());
    let (cookie, _) = signed_in_cookie(&state, "user-1", 3600).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/session")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["subject_id"], "user-1");
    assert!(body["expires"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_list_videos_forwards_bearer_token() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video/user"))
        .and(header_matcher("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "v1", "fileName": "cat.mp4", "thumbnailUrl": "thumbs/v1.jpg", "status": "ready"},
            {"id": "v2", "fileName": "dog.mp4", "status": "processing"}
        ])))
        .expect(1)
        .mount(&api)
        .await;

    let (app, state) = create_test_app(test_config("http://127.0.0.1:9", &api.uri()));
    let (cookie, _) = signed_in_cookie(&state, "user-1", 3600).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/videos")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["fileName"], "cat.mp4");
    assert_eq!(body[1]["status"], "processing");
    assert!(body[1]["thumbnailUrl"].is_null());
}

#[tokio::test]
async fn test_failed_refresh_ends_session_and_clears_cookie() {
    let identity = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&identity)
        .await;

    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&api)
        .await;

    let (app, state) = create_test_app(test_config(&identity.uri(), &api.uri()));
    let (cookie, session_id) = signed_in_cookie(&state, "user-1", 0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/videos")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cleared = set_cookie_headers(&response);
    assert!(cleared
        .iter()
        .any(|c| c.starts_with("vidboard_session=;") && c.contains("Max-Age=0")));
    assert_eq!(body_json(response).await["error"], "session_expired");
    assert!(state.sessions.get(&session_id).is_none());

    // The same cookie no longer works.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/videos")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/videos")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_session_info_refreshes_expired_token() {
    let identity = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 300
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let (app, state) = create_test_app(test_config(&identity.uri(), "http://127.0.0.1:9"));
    let (cookie, _) = signed_in_cookie(&state, "user-1", 0).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/session")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expires = body_json(response).await["expires"]
        .as_str()
        .unwrap()
        .parse::<chrono::DateTime<chrono::Utc>>()
        .unwrap();
    assert!(expires > chrono::Utc::now());
}

#[tokio::test]
async fn test_session_info_for_unrefreshable_session_is_401() {
    let identity = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let (app, state) = create_test_app(test_config(&identity.uri(), "http://127.0.0.1:9"));
    let (cookie, session_id) = signed_in_cookie(&state, "user-1", 0).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/session")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "session_expired");
    assert!(state.sessions.get(&session_id).is_none());
}

#[tokio::test]
async fn test_cors_rejects_lookalike_localhost_origin() {
    let (app, _) = create_test_app(Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/videos")
                .header(header::ORIGIN, "http://localhost.evil.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
