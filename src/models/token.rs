// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider token models.

use serde::{Deserialize, Serialize};

/// Token endpoint response (authorization-code and refresh grants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only present when the provider rotates the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Identity assertion; present on the authorization-code grant.
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Claims read from the identity assertion payload.
///
/// The signature is not checked here; the provider already authenticated
/// the user during the code exchange over TLS.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Stable subject identifier of the signed-in user
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}
