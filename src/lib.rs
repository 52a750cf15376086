// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! vidboard: session and playback backend for a video dashboard
//!
//! This crate signs users in against an OpenID Connect provider, keeps
//! their access tokens fresh, proxies the remote video API, and provides
//! the quality-switching player controller used by the playback view.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod player;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use middleware::cookies::SESSION_TTL_DAYS;
use services::{IdentityClient, SessionStore, VideoService};
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: IdentityClient,
    pub sessions: SessionStore,
    pub videos: VideoService,
}

impl AppState {
    /// Build every service from the configuration.
    pub fn new(config: Config) -> Self {
        let identity = IdentityClient::new(
            &config.identity_issuer,
            config.identity_client_id.clone(),
            config.identity_client_secret.clone(),
        );
        let sessions = SessionStore::new(
            identity.clone(),
            config.refresh_leeway_secs,
            Duration::from_secs(SESSION_TTL_DAYS as u64 * 24 * 60 * 60),
        );
        let videos = VideoService::new(&config.api_url);

        Self {
            config,
            identity,
            sessions,
            videos,
        }
    }
}
