//! Test helper modules for playd-ap integration tests
//!
//! - flac_writer: Generate small FLAC fixtures on the fly
//! - mp3_writer: Generate small constant-bitrate MP3 fixtures on the fly
//! - fake_sources: Synthetic sources and an opener that needs no audio files

#![allow(dead_code)]

mod bit_writer;
pub mod fake_sources;
pub mod flac_writer;
pub mod mp3_writer;

pub use fake_sources::{service_with_tracks, FakeOpener, ToneSource, TRACK_FRAMES};
pub use flac_writer::{write_flac, FLAC_SAMPLE_RATE};
pub use mp3_writer::{write_mp3, MP3_FRAME_SAMPLES, MP3_SAMPLE_RATE};
