// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, session cookies, security headers).

pub mod auth;
pub mod cookies;
pub mod security;

pub use auth::require_auth;
