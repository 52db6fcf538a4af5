//! # playd Audio Player Library (playd-ap)
//!
//! Background playback engine for the playd UI.
//!
//! **Purpose:** Decode MP3 and FLAC files, maintain the play queue and the
//! priority sub-queue, and serve transport commands from the UI process over
//! a local socket.
//!
//! **Architecture:** Decoder sources (symphonia) feed a renderer thread that
//! resamples (rubato) into a lock-free ring drained by the device callback
//! (cpal). A playback-control thread turns UI intent into source swaps.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod service;
pub mod sources;
pub mod store;

pub use error::{Error, Result};
pub use service::MainService;
