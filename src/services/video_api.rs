// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote video API client.
//!
//! Handles:
//! - Listing the user's videos
//! - Playback URLs per resolution
//! - Thumbnail preview URLs
//! - The initiate / transfer / confirm upload workflow

use crate::error::AppError;
use crate::models::{InitiateUploadResponse, PlaybackUrls, PreviewUrl, Video};
use crate::services::session::SessionTokenManager;
use axum::body::Bytes;
use serde::Deserialize;

/// Low-level video API client. Every call takes the bearer token explicitly.
#[derive(Clone)]
pub struct VideoApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl VideoApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /video/user`
    pub async fn list_videos(&self, access_token: &str) -> Result<Vec<Video>, AppError> {
        let url = format!("{}/video/user", self.base_url);
        self.get_json(&url, access_token).await
    }

    /// `GET /video/{id}/play`
    pub async fn playback_urls(
        &self,
        access_token: &str,
        video_id: &str,
    ) -> Result<PlaybackUrls, AppError> {
        let url = format!(
            "{}/video/{}/play",
            self.base_url,
            urlencoding::encode(video_id)
        );
        self.get_json(&url, access_token).await
    }

    /// `GET /video/preview-url?key=`
    pub async fn preview_url(&self, access_token: &str, key: &str) -> Result<String, AppError> {
        let url = format!("{}/video/preview-url", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| AppError::VideoApi(e.to_string()))?;

        let preview: PreviewUrl = self.check_response_json(response).await?;
        Ok(preview.url)
    }

    /// `POST /video/initiate-upload`
    pub async fn initiate_upload(
        &self,
        access_token: &str,
        user_id: &str,
        file_name: &str,
    ) -> Result<InitiateUploadResponse, AppError> {
        let url = format!("{}/video/initiate-upload", self.base_url);

        let body = serde_json::json!({
            "userId": user_id,
            "fileName": file_name,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VideoApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// PUT the file body to a pre-signed storage URL (no bearer token).
    pub async fn upload_to_presigned_url(
        &self,
        upload_url: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), AppError> {
        let mut request = self.http.put(upload_url).body(body);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::VideoApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// `POST /video/confirm-upload`
    pub async fn confirm_upload(&self, access_token: &str, video_id: &str) -> Result<(), AppError> {
        let url = format!("{}/video/confirm-upload", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "videoId": video_id }))
            .send()
            .await
            .map_err(|e| AppError::VideoApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::VideoApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(upstream_error(status, &body))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::VideoApi(format!("JSON parse error: {}", e)))
    }
}

/// The upstream body is logged, never passed on to the client.
fn upstream_error(status: u16, body: &str) -> AppError {
    tracing::warn!(status, body = %body, "Video API request failed");
    AppError::Upstream {
        status,
        message: "Video API request failed".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VideoService - API calls authorized through the session token manager
// ─────────────────────────────────────────────────────────────────────────────

/// Which upload step failed, for the user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    Initiate,
    Transfer,
    Confirm,
}

impl UploadStep {
    pub fn message(self) -> &'static str {
        match self {
            UploadStep::Initiate => "Failed to get upload URL",
            UploadStep::Transfer => "Upload failed",
            UploadStep::Confirm => "Upload confirmation failed",
        }
    }
}

/// Video API calls for a signed-in session.
///
/// The bearer token always comes from `SessionTokenManager::get_valid_token`.
#[derive(Clone)]
pub struct VideoService {
    client: VideoApiClient,
}

impl VideoService {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: VideoApiClient::new(api_url),
        }
    }

    pub async fn list_videos(&self, session: &SessionTokenManager) -> Result<Vec<Video>, AppError> {
        let access_token = session.get_valid_token().await?;
        self.client.list_videos(&access_token).await
    }

    pub async fn playback_urls(
        &self,
        session: &SessionTokenManager,
        video_id: &str,
    ) -> Result<PlaybackUrls, AppError> {
        let access_token = session.get_valid_token().await?;
        self.client.playback_urls(&access_token, video_id).await
    }

    pub async fn preview_url(
        &self,
        session: &SessionTokenManager,
        key: &str,
    ) -> Result<String, AppError> {
        let access_token = session.get_valid_token().await?;
        self.client.preview_url(&access_token, key).await
    }

    /// Run the whole upload: initiate, PUT to the pre-signed URL, confirm.
    ///
    /// Returns the new video id. No step is retried.
    pub async fn upload_video(
        &self,
        session: &SessionTokenManager,
        user_id: &str,
        file_name: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, AppError> {
        let access_token = session.get_valid_token().await?;
        let initiated = self
            .client
            .initiate_upload(&access_token, user_id, file_name)
            .await
            .map_err(|e| upload_error(UploadStep::Initiate, e))?;

        tracing::info!(
            video_id = %initiated.video_id,
            file_name,
            bytes = body.len(),
            "Uploading video to pre-signed URL"
        );

        self.client
            .upload_to_presigned_url(&initiated.upload_url, body, content_type)
            .await
            .map_err(|e| upload_error(UploadStep::Transfer, e))?;

        // The transfer may outlive the access token.
        let access_token = session.get_valid_token().await?;
        self.client
            .confirm_upload(&access_token, &initiated.video_id)
            .await
            .map_err(|e| upload_error(UploadStep::Confirm, e))?;

        tracing::info!(video_id = %initiated.video_id, "Upload confirmed");
        Ok(initiated.video_id)
    }
}

fn upload_error(step: UploadStep, err: AppError) -> AppError {
    if err.requires_reauthentication() {
        return err;
    }
    tracing::warn!(step = ?step, error = %err, "Upload step failed");
    AppError::Upload(step.message().to_string())
}
