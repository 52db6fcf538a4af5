//! # playd Common Library
//!
//! Shared code for both ends of the playd UI/service pair:
//! - Track, repeat and playback-state types
//! - Wire protocol (opcodes, request/response framing)
//! - Blocking protocol client
//! - Configuration file resolution

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{Error, Result};
pub use types::{PlaybackState, RepeatMode, ShuffleMode, TrackId, TrackInfo};
