// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session lifecycle and outbound API clients.

pub mod identity;
pub mod session;
pub mod video_api;

pub use identity::{IdentityClient, IdentityError};
pub use session::{SessionError, SessionSnapshot, SessionStore, SessionTokenManager};
pub use video_api::{UploadStep, VideoApiClient, VideoService};
