//! Playback intent: cross-thread transport signals
//!
//! The command and headset threads write these; the playback-control thread
//! polls and consumes them. Each field is its own atomic and no operation
//! spans two of them. `song_action` is a single cell, so the latest request
//! wins.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Pending transport action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SongAction {
    Nothing = 0,
    Previous = 1,
    Next = 2,
    /// Re-open the selected track from the start
    Replay = 3,
    /// Open the play queue's current track (after the queue or cursor was
    /// replaced)
    Jump = 4,
}

impl From<u8> for SongAction {
    fn from(value: u8) -> Self {
        match value {
            1 => SongAction::Previous,
            2 => SongAction::Next,
            3 => SongAction::Replay,
            4 => SongAction::Jump,
            _ => SongAction::Nothing,
        }
    }
}

// f64 bit pattern of NaN; never produced by a valid seek request
const NO_SEEK: u64 = u64::MAX;

pub struct PlaybackIntent {
    song_action: AtomicU8,
    seek_to: AtomicU64,
    exit: AtomicBool,
    playing_from: RwLock<String>,
}

impl Default for PlaybackIntent {
    fn default() -> Self {
        Self {
            song_action: AtomicU8::new(SongAction::Nothing as u8),
            seek_to: AtomicU64::new(NO_SEEK),
            exit: AtomicBool::new(false),
            playing_from: RwLock::new(String::new()),
        }
    }
}

impl PlaybackIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, action: SongAction) {
        self.song_action.store(action as u8, Ordering::Release);
    }

    /// Consume the pending action
    pub fn take_action(&self) -> SongAction {
        SongAction::from(
            self.song_action
                .swap(SongAction::Nothing as u8, Ordering::AcqRel),
        )
    }

    pub fn pending_action(&self) -> SongAction {
        SongAction::from(self.song_action.load(Ordering::Acquire))
    }

    /// Request a seek; negative and non-finite positions become 0
    pub fn request_seek(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.seek_to.store(seconds.to_bits(), Ordering::Release);
    }

    /// Consume the pending seek, in seconds
    pub fn take_seek(&self) -> Option<f64> {
        match self.seek_to.swap(NO_SEEK, Ordering::AcqRel) {
            NO_SEEK => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub fn clear_seek(&self) {
        self.seek_to.store(NO_SEEK, Ordering::Release);
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    pub fn should_exit(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    pub fn set_playing_from(&self, label: String) {
        *self.playing_from.write() = label;
    }

    pub fn playing_from(&self) -> String {
        self.playing_from.read().clone()
    }
}

/// Double-press detection for Previous
///
/// A press within `threshold` of the previous press moves back a track;
/// otherwise the current track restarts.
#[derive(Debug, Default)]
pub struct PreviousPress {
    last: Option<Instant>,
}

impl PreviousPress {
    pub fn press(&mut self, now: Instant, threshold: Duration) -> SongAction {
        let action = match self.last {
            Some(last) if now.saturating_duration_since(last) < threshold => SongAction::Previous,
            _ => SongAction::Replay,
        };
        self.last = Some(now);
        action
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
