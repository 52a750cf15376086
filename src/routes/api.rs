// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::Video;
use crate::player::{sources_from_playback, MediaSource};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require an authenticated session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/videos", get(list_videos))
        .route("/api/videos/{id}/play", get(get_playback))
        .route("/api/image-proxy", get(image_proxy))
        .route(
            "/api/uploads",
            post(upload_video).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub subject_id: String,
    /// Access token expiry (RFC 3339)
    pub expires: String,
}

/// Describe the current session, refreshing the access token if it is due.
async fn get_session(Extension(auth): Extension<AuthSession>) -> Result<Json<SessionResponse>> {
    auth.tokens.get_valid_token().await?;
    let snapshot = auth.tokens.snapshot().await.ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse {
        subject_id: snapshot.subject_id,
        expires: format_utc_rfc3339(snapshot.expires_at),
    }))
}

// ─── Videos ──────────────────────────────────────────────────

/// List the signed-in user's videos.
async fn list_videos(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Json<Vec<Video>>> {
    let videos = state.videos.list_videos(&auth.tokens).await?;
    tracing::debug!(subject_id = %auth.subject_id, count = videos.len(), "Listed videos");
    Ok(Json(videos))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlaybackResponse {
    pub video_id: String,
    /// Thumbnail storage key; load through `/api/image-proxy`
    pub poster: Option<String>,
    /// Renditions, highest quality first; the player loads the first one
    pub sources: Vec<MediaSource>,
}

/// Playback sources for one video.
async fn get_playback(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(video_id): Path<String>,
) -> Result<Json<PlaybackResponse>> {
    let urls = state
        .videos
        .playback_urls(&auth.tokens, &video_id)
        .await
        .map_err(|e| match e {
            AppError::Upstream { status, .. } => {
                tracing::debug!(video_id = %video_id, status, "Playback lookup failed");
                AppError::NotFound(format!("Video {}", video_id))
            }
            other => other,
        })?;

    let sources = sources_from_playback(&urls);
    if sources.is_empty() {
        return Err(AppError::NotFound(format!(
            "No playable renditions for video {}",
            video_id
        )));
    }

    Ok(Json(PlaybackResponse {
        video_id,
        poster: urls.thumbnail_url,
        sources,
    }))
}

// ─── Image proxy ─────────────────────────────────────────────

#[derive(Deserialize)]
struct ImageProxyQuery {
    key: Option<String>,
}

/// Resolve a thumbnail key to a signed URL and redirect to it.
async fn image_proxy(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Query(params): Query<ImageProxyQuery>,
) -> Result<Redirect> {
    let key = params
        .key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing key".to_string()))?;

    let url = state
        .videos
        .preview_url(&auth.tokens, &key)
        .await
        .map_err(|e| match e {
            AppError::Upstream { status, .. } => AppError::Upstream {
                status,
                message: "Failed to fetch preview URL".to_string(),
            },
            other => other,
        })?;

    Ok(Redirect::temporary(&url))
}

// ─── Upload ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct UploadQuery {
    #[validate(length(min = 1, max = 255))]
    file_name: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UploadResponse {
    pub video_id: String,
    pub message: String,
}

/// Upload a video: the request body is the file itself.
async fn upload_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Query(params): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid file_name: {}", e)))?;

    if body.is_empty() {
        return Err(AppError::BadRequest("No file selected".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("video/"));

    let video_id = state
        .videos
        .upload_video(
            &auth.tokens,
            &auth.subject_id,
            &params.file_name,
            body,
            content_type,
        )
        .await?;

    Ok(Json(UploadResponse {
        video_id,
        message: "Upload complete!".to_string(),
    }))
}
