// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OpenID Connect sign-in routes.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, decode_jwt, session_jwt};
use crate::middleware::cookies::{clear_session_cookie, session_cookie};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a sign-in attempt may take before its state is rejected.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signin", get(sign_in))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
}

/// Query parameters for starting the sign-in flow.
#[derive(Deserialize)]
pub struct SignInParams {
    /// Frontend path to land on after sign-in. Must be a local path.
    #[serde(default)]
    return_to: Option<String>,
}

/// Build the callback URL from the request's Host header.
fn callback_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/callback", scheme, host)
}

/// Only same-site paths are accepted as post-login targets.
fn sanitize_return_to(return_to: Option<String>) -> String {
    match return_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('|') => {
            path
        }
        _ => "/".to_string(),
    }
}

/// Start sign-in - redirect to the identity provider.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SignInParams>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let return_to = sanitize_return_to(params.return_to);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(&return_to, timestamp, &state.config.session_signing_key)?;
    let auth_url = state
        .identity
        .authorization_url(&callback_url(&headers), &oauth_state);

    tracing::info!(
        client_id = %state.config.identity_client_id,
        return_to = %return_to,
        "Starting sign-in, redirecting to identity provider"
    );

    Ok(Redirect::temporary(&auth_url))
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

/// Sign-in callback - exchange code for tokens, create the session.
async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = state.config.frontend_url.trim_end_matches('/');

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Sign-in error from identity provider");
        let redirect = format!("{}/?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let return_to = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.session_signing_key, now_ms))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired sign-in state".to_string()))?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let tokens = state
        .identity
        .exchange_code(&code, &callback_url(&headers))
        .await?;

    let (session_id, subject_id) = state.sessions.create(tokens).await?;

    let jwt = create_jwt(&session_id, &subject_id, &state.config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(subject_id = %subject_id, "Sign-in complete, session created");

    let jar = jar.add(session_cookie(&jwt, state.config.secure_cookies()));
    let redirect_url = format!("{}{}", frontend_url, return_to);
    Ok((jar, Redirect::temporary(&redirect_url)))
}

/// Logout - end the server-side session and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(claims) = session_jwt(&jar, &headers)
        .and_then(|jwt| decode_jwt(&jwt, &state.config.session_signing_key))
    {
        state.sessions.remove(&claims.sid).await;
    }

    let jar = jar.add(clear_session_cookie(state.config.secure_cookies()));
    (jar, StatusCode::NO_CONTENT)
}

/// Sign `return_to|timestamp_hex` and pack it as base64url.
fn sign_state(return_to: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", return_to, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify the state signature and age; returns the post-login path.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "return_to|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let return_to = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", return_to, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if !bool::from(signature_hex.as_bytes().ct_eq(expected_signature.as_bytes())) {
        tracing::error!("Sign-in state signature mismatch! Potential tampering.");
        return None;
    }

    let timestamp = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(timestamp) > STATE_MAX_AGE_MS {
        tracing::warn!("Sign-in state expired");
        return None;
    }

    Some(return_to.to_string())
}
