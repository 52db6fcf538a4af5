//! Volume and mute
//!
//! Muting saves the current level and drops the device volume to zero;
//! unmuting restores it. Setting a volume while muted unmutes. The device
//! callback reads only the lock-free effective level.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct VolumeState {
    volume: f32,
    muted: bool,
    /// Level to restore on unmute
    mute_level: f32,
}

pub struct VolumeControl {
    state: Mutex<VolumeState>,
    /// f32 bits of the level the callback applies
    effective: AtomicU32,
}

impl VolumeControl {
    pub fn new(initial: f32) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        Self {
            state: Mutex::new(VolumeState {
                volume: initial,
                muted: false,
                mute_level: initial,
            }),
            effective: AtomicU32::new(initial.to_bits()),
        }
    }

    /// Set the level (clamped to 0.0 - 1.0); unmutes
    pub fn set_volume(&self, level: f32) {
        let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
        let mut state = self.state.lock();
        state.volume = level;
        state.muted = false;
        self.effective.store(level.to_bits(), Ordering::Release);
        debug!("Volume set to {:.2}", level);
    }

    pub fn set_muted(&self, muted: bool) {
        let mut state = self.state.lock();
        if muted == state.muted {
            return;
        }
        if muted {
            state.mute_level = state.volume;
            state.volume = 0.0;
        } else {
            state.volume = state.mute_level;
        }
        state.muted = muted;
        self.effective.store(state.volume.to_bits(), Ordering::Release);
        debug!("Muted: {}", muted);
    }

    /// User-facing level; while muted this is the level that unmute restores
    pub fn level(&self) -> f32 {
        let state = self.state.lock();
        if state.muted {
            state.mute_level
        } else {
            state.volume
        }
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    /// Level applied to the output (0 while muted)
    pub fn effective(&self) -> f32 {
        f32::from_bits(self.effective.load(Ordering::Acquire))
    }
}
