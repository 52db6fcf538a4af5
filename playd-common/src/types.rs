//! Core value types shared across the protocol boundary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key identifying a song in the external metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TrackId {
    fn from(id: i32) -> Self {
        TrackId(id)
    }
}

/// What happens when the play queue cursor passes its end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RepeatMode {
    #[default]
    Off = 0,
    One = 1,
    All = 2,
}

impl From<RepeatMode> for u8 {
    fn from(mode: RepeatMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for RepeatMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RepeatMode::Off),
            1 => Ok(RepeatMode::One),
            2 => Ok(RepeatMode::All),
            _ => Err(()),
        }
    }
}

/// Whether the play order is the insertion order or a permutation of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ShuffleMode {
    #[default]
    Off = 0,
    On = 1,
}

impl From<ShuffleMode> for u8 {
    fn from(mode: ShuffleMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for ShuffleMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShuffleMode::Off),
            1 => Ok(ShuffleMode::On),
            _ => Err(()),
        }
    }
}

/// State of the current track transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PlaybackState {
    /// No active source
    #[default]
    Idle = 0,
    /// Source factory invoked, waiting for a decoder
    Loading = 1,
    Playing = 2,
    Paused = 3,
    /// Active source reached end of stream
    Finished = 4,
}

impl From<PlaybackState> for u8 {
    fn from(state: PlaybackState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for PlaybackState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlaybackState::Idle),
            1 => Ok(PlaybackState::Loading),
            2 => Ok(PlaybackState::Playing),
            3 => Ok(PlaybackState::Paused),
            4 => Ok(PlaybackState::Finished),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Finished => write!(f, "finished"),
        }
    }
}

/// Metadata for a track, as reported by the metadata store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in seconds (0 when unknown)
    pub duration_secs: u32,
}

impl TrackInfo {
    /// Placeholder shown when the store has nothing for `id`
    pub fn unknown(id: TrackId) -> Self {
        Self {
            id,
            title: id.to_string(),
            artist: String::new(),
            album: String::new(),
            duration_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_mode_round_trips_through_u8() {
        for mode in [RepeatMode::Off, RepeatMode::One, RepeatMode::All] {
            assert_eq!(RepeatMode::try_from(u8::from(mode)), Ok(mode));
        }
        assert!(RepeatMode::try_from(7).is_err());
    }

    #[test]
    fn test_playback_state_rejects_unknown_values() {
        assert_eq!(PlaybackState::try_from(2), Ok(PlaybackState::Playing));
        assert!(PlaybackState::try_from(5).is_err());
    }

    #[test]
    fn test_unknown_track_info_uses_raw_id() {
        let info = TrackInfo::unknown(TrackId(42));
        assert_eq!(info.title, "42");
        assert!(info.artist.is_empty());
    }

    #[test]
    fn test_repeat_mode_serializes_lowercase() {
        let json = serde_json::to_string(&RepeatMode::All).unwrap();
        assert_eq!(json, "\"all\"");
    }
}
