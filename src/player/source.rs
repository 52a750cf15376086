// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media source descriptors.

use crate::models::PlaybackUrls;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One rendition of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MediaSource {
    pub src: String,
    /// Short quality identifier shown on the quality control (e.g. "720p")
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,
}

impl MediaSource {
    pub fn new(src: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            label: label.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Build the ordered source list (highest quality first) for a video.
pub fn sources_from_playback(urls: &PlaybackUrls) -> Vec<MediaSource> {
    urls.renditions()
        .into_iter()
        .map(|(label, src)| MediaSource::new(src, label).with_mime_type("video/mp4"))
        .collect()
}
