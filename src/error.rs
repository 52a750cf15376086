// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::identity::IdentityError;
use crate::services::session::SessionError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Video API error: {0}")]
    VideoApi(String),

    /// Upstream answered with a non-success status that the caller should see.
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Upload(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the user has to go through sign-in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::SessionExpired)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthenticated => AppError::Unauthorized,
            SessionError::SessionExpired(_) => AppError::SessionExpired,
            SessionError::MalformedAssertion(msg) => {
                AppError::BadRequest(format!("Malformed identity token: {}", msg))
            }
            SessionError::MissingRefreshToken => {
                AppError::Identity("Token response carried no refresh token".to_string())
            }
            SessionError::InvalidLifetime(secs) => {
                AppError::Identity(format!("Token lifetime out of range: {}s", secs))
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::Identity(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::VideoApi(msg) => {
                tracing::warn!(error = %msg, "Video API error");
                (StatusCode::BAD_GATEWAY, "video_api_error", Some(msg.clone()))
            }
            AppError::Upstream { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "upstream_error",
                Some(message.clone()),
            ),
            AppError::Upload(msg) => (StatusCode::BAD_GATEWAY, "upload_failed", Some(msg.clone())),
            AppError::Identity(msg) => {
                tracing::warn!(error = %msg, "Identity provider error");
                (StatusCode::BAD_GATEWAY, "identity_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
