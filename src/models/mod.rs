// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models exchanged with the identity provider and the video API.

pub mod token;
pub mod video;

pub use token::{IdentityClaims, TokenResponse};
pub use video::{InitiateUploadResponse, PlaybackUrls, PreviewUrl, Video};
