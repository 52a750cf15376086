// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! vidboard API server
//!
//! Signs users in, keeps their video API tokens fresh, and proxies the
//! video API for the dashboard frontend.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidboard::{config::Config, AppState};

const SESSION_PRUNE_INTERVAL_SECS: u64 = 60 * 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        issuer = %config.identity_issuer,
        api_url = %config.api_url,
        refresh_leeway_secs = config.refresh_leeway_secs,
        "Starting vidboard API"
    );

    let state = Arc::new(AppState::new(config.clone()));

    // Drop sessions whose cookie has expired
    let _pruner = state
        .sessions
        .spawn_pruner(Duration::from_secs(SESSION_PRUNE_INTERVAL_SECS));

    // Build router
    let app = vidboard::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidboard=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
