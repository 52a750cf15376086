// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Name of the cookie carrying the session JWT.
pub const SESSION_COOKIE: &str = "vidboard_session";

/// Session lifetime in days (the identity provider may end it sooner).
pub const SESSION_TTL_DAYS: i64 = 30;

/// Create the session cookie.
pub fn session_cookie(jwt: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Create the removal cookie for the session, with matching attributes.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
