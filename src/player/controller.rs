// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player controller that switches between renditions while keeping the
//! playback position and the paused/playing state.
//!
//! The controller is driven by events: `select_source` starts loading a new
//! rendition, and the surface later reports `on_loaded_metadata` with the
//! ticket it was given. Position is only restored after that signal; seeking
//! before metadata is available is not reliable on real media elements.

use super::source::MediaSource;

/// Errors from the player controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("no media sources to play")]
    NoSources,

    #[error("source index {index} out of range (have {len})")]
    InvalidIndex { index: usize, len: usize },

    #[error("no source labelled {0:?}")]
    UnknownLabel(String),

    #[error("player has been disposed")]
    Disposed,
}

/// Identifies one `load` call so a late metadata signal can be matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// The rendering side of the player (a media element, a decoder, a test fake).
pub trait PlaybackSurface {
    /// Replace the current media with `source`. The surface must answer with
    /// `PlayerController::on_loaded_metadata(ticket)` once metadata is ready.
    fn load(&mut self, source: &MediaSource, ticket: LoadTicket);

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    fn seek(&mut self, seconds: f64);

    fn is_paused(&self) -> bool;

    fn play(&mut self);

    fn set_poster(&mut self, poster: Option<&str>);

    /// Text of the quality control.
    fn show_quality_label(&mut self, label: &str);

    /// Free decoder and media resources. Called at most once.
    fn release(&mut self);
}

/// Entry of the data-driven quality menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityMenuItem {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}

/// Position and play state captured right before a switch.
#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    ticket: LoadTicket,
    position: f64,
    was_playing: bool,
}

/// Holds the source list and the one active source feeding the surface.
pub struct PlayerController<S: PlaybackSurface> {
    surface: Option<S>,
    sources: Vec<MediaSource>,
    active: usize,
    next_ticket: u64,
    pending: Option<PendingRestore>,
}

impl<S: PlaybackSurface> PlayerController<S> {
    /// Bind to `surface` and load the first source.
    pub fn initialize(
        mut surface: S,
        sources: Vec<MediaSource>,
        poster: Option<&str>,
    ) -> Result<Self, PlayerError> {
        if sources.is_empty() {
            return Err(PlayerError::NoSources);
        }

        surface.set_poster(poster);

        let mut controller = Self {
            surface: None,
            sources,
            active: 0,
            next_ticket: 0,
            pending: None,
        };

        let ticket = controller.issue_ticket();
        surface.load(&controller.sources[0], ticket);
        surface.show_quality_label(&controller.sources[0].label);
        controller.surface = Some(surface);

        tracing::debug!(
            label = %controller.sources[0].label,
            count = controller.sources.len(),
            "Player initialized"
        );
        Ok(controller)
    }

    /// Switch to `sources[index]`, keeping position and play state.
    pub fn select_source(&mut self, index: usize) -> Result<(), PlayerError> {
        let len = self.sources.len();
        if index >= len {
            return Err(PlayerError::InvalidIndex { index, len });
        }
        if self.surface.is_none() {
            return Err(PlayerError::Disposed);
        }
        if index == self.active {
            return Ok(());
        }

        let ticket = self.issue_ticket();
        let Some(surface) = self.surface.as_mut() else {
            return Err(PlayerError::Disposed);
        };

        // While an earlier switch is still loading, the surface reports the
        // new media's position (0), so keep what that switch captured.
        let (position, was_playing) = match self.pending {
            Some(pending) => (pending.position, pending.was_playing),
            None => (surface.current_time(), !surface.is_paused()),
        };

        let source = &self.sources[index];
        surface.load(source, ticket);
        surface.show_quality_label(&source.label);

        tracing::debug!(
            from = %self.sources[self.active].label,
            to = %source.label,
            position,
            was_playing,
            "Switching quality"
        );

        self.active = index;
        self.pending = Some(PendingRestore {
            ticket,
            position,
            was_playing,
        });
        Ok(())
    }

    /// Switch to the source carrying `label`.
    pub fn select_label(&mut self, label: &str) -> Result<(), PlayerError> {
        let index = self
            .sources
            .iter()
            .position(|s| s.label == label)
            .ok_or_else(|| PlayerError::UnknownLabel(label.to_string()))?;
        self.select_source(index)
    }

    /// Metadata-ready signal from the surface.
    ///
    /// Returns `true` if a pending position restore was applied.
    pub fn on_loaded_metadata(&mut self, ticket: LoadTicket) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let Some(pending) = self.pending else {
            return false;
        };
        if pending.ticket != ticket {
            return false;
        }

        self.pending = None;
        surface.seek(pending.position);
        if pending.was_playing {
            surface.play();
        }
        true
    }

    /// Release the surface. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.pending = None;
        if let Some(mut surface) = self.surface.take() {
            surface.release();
            tracing::debug!("Player disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.surface.is_none()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_source(&self) -> &MediaSource {
        &self.sources[self.active]
    }

    pub fn sources(&self) -> &[MediaSource] {
        &self.sources
    }

    /// Whether a switch is waiting for its metadata signal.
    pub fn is_switching(&self) -> bool {
        self.pending.is_some()
    }

    /// Menu entries in source order, with the active one selected.
    pub fn quality_menu(&self) -> Vec<QualityMenuItem> {
        self.sources
            .iter()
            .enumerate()
            .map(|(index, source)| QualityMenuItem {
                index,
                label: source.label.clone(),
                selected: index == self.active,
            })
            .collect()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    fn issue_ticket(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        LoadTicket(self.next_ticket)
    }
}

impl<S: PlaybackSurface> Drop for PlayerController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
