// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video API models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A video owned by the signed-in user, as listed by `GET /video/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Video {
    pub id: String,
    pub file_name: String,
    /// Storage key of the thumbnail; resolve through the image proxy
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Processing status (e.g. "processing", "ready")
    pub status: String,
}

/// Per-resolution playback URLs from `GET /video/{id}/play`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaybackUrls {
    #[serde(rename = "video1080pUrl", default)]
    pub video_1080p_url: Option<String>,
    #[serde(rename = "video720pUrl", default)]
    pub video_720p_url: Option<String>,
    #[serde(rename = "video480pUrl", default)]
    pub video_480p_url: Option<String>,
    #[serde(rename = "video144pUrl", default)]
    pub video_144p_url: Option<String>,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
}

impl PlaybackUrls {
    /// Available renditions, highest quality first.
    pub fn renditions(&self) -> Vec<(&'static str, &str)> {
        [
            ("1080p", self.video_1080p_url.as_deref()),
            ("720p", self.video_720p_url.as_deref()),
            ("480p", self.video_480p_url.as_deref()),
            ("144p", self.video_144p_url.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, url)| url.filter(|u| !u.is_empty()).map(|u| (label, u)))
        .collect()
    }
}

/// Response of `GET /video/preview-url`.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewUrl {
    pub url: String,
}

/// Response of `POST /video/initiate-upload`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    /// Pre-signed storage URL accepting a single PUT of the file body
    pub upload_url: String,
    pub video_id: String,
}
