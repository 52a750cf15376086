// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quality-switchable player: a list of alternate renditions feeding a
//! single playback surface.

pub mod controller;
pub mod source;

pub use controller::{
    LoadTicket, PlaybackSurface, PlayerController, PlayerError, QualityMenuItem,
};
pub use source::{sources_from_playback, MediaSource};
