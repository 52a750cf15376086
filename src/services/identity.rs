// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OpenID Connect identity provider client (Keycloak).
//!
//! Handles:
//! - Authorization URL construction for the sign-in redirect
//! - Authorization-code exchange
//! - Refresh-token grant
//! - Identity assertion payload decoding

use crate::models::{IdentityClaims, TokenResponse};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Identity provider errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("token request failed: {0}")]
    Request(String),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Parse(String),
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: String,
}

impl IdentityClient {
    /// Create a client for a Keycloak realm issuer URL.
    pub fn new(issuer: &str, client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            issuer: issuer.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.issuer)
    }

    /// Authorization endpoint URL for the sign-in redirect.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/protocol/openid-connect/auth?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope=openid%20profile%20email&\
             state={}",
            self.issuer,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for the initial token set.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, IdentityError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, IdentityError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON token body.
    async fn check_response_json(
        &self,
        response: reqwest::Response,
    ) -> Result<TokenResponse, IdentityError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }
}

/// Decode the payload segment of an identity assertion (compact JWT).
///
/// Only the payload is read. Anything other than three dot-separated
/// segments with a base64url JSON payload carrying a non-empty `sub` is
/// rejected.
pub fn decode_identity_assertion(assertion: &str) -> Result<IdentityClaims, String> {
    let parts: Vec<&str> = assertion.split('.').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 segments, got {}", parts.len()));
    }

    // Some providers pad the segments; RFC 7515 does not.
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| format!("payload is not base64url: {}", e))?;

    let claims: IdentityClaims =
        serde_json::from_slice(&payload).map_err(|e| format!("payload is not JSON: {}", e))?;

    if claims.sub.trim().is_empty() {
        return Err("empty sub claim".to_string());
    }

    Ok(claims)
}
