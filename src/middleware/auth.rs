// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::middleware::cookies::{clear_session_cookie, SESSION_COOKIE, SESSION_TTL_DAYS};
use crate::services::session::SessionTokenManager;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider user ID)
    pub sub: String,
    /// Session ID in the session store
    pub sid: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated session extracted from the JWT.
#[derive(Clone)]
pub struct AuthSession {
    pub session_id: String,
    pub subject_id: String,
    pub tokens: Arc<SessionTokenManager>,
}

/// Pull the session JWT from the cookie, falling back to a bearer header.
pub fn session_jwt(jar: &CookieJar, headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Decode and validate a session JWT.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> Option<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Middleware that requires a live session.
///
/// If the session ends while the request runs (refresh failed), it is
/// dropped from the store and the session cookie is cleared.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_jwt(&jar, request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims =
        decode_jwt(&token, &state.config.session_signing_key).ok_or(StatusCode::UNAUTHORIZED)?;

    let tokens = state
        .sessions
        .get(&claims.sid)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let auth_session = AuthSession {
        session_id: claims.sid.clone(),
        subject_id: claims.sub,
        tokens: tokens.clone(),
    };
    request.extensions_mut().insert(auth_session);

    let response = next.run(request).await;

    if !tokens.is_authenticated().await {
        tracing::info!(session_id = %claims.sid, "Session ended during request");
        state.sessions.remove(&claims.sid).await;
        let jar = jar.add(clear_session_cookie(state.config.secure_cookies()));
        return Ok((jar, response).into_response());
    }

    Ok(response)
}

/// Create a JWT for a user session.
pub fn create_jwt(session_id: &str, subject_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: subject_id.to_string(),
        sid: session_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_DAYS as usize * 24 * 60 * 60,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
