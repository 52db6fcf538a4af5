//! Configuration for the playd-ap service
//!
//! Bootstrap settings come from a TOML file resolved by
//! [`playd_common::config::resolve_config_path`]. Every key has a built-in
//! default, so a missing file or a partial file still yields a usable config.
//! Command-line arguments override a handful of keys after loading.

use crate::error::{Error, Result};
use playd_common::protocol::{DEFAULT_MAX_PAYLOAD, DEFAULT_PORT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite metadata store (read-only lookups)
    pub database_path: PathBuf,
    pub server: ServerConfig,
    pub playback: PlaybackConfig,
    pub audio: AudioConfig,
    pub mp3: Mp3Config,
    pub headset: HeadsetConfig,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            server: ServerConfig::default(),
            playback: PlaybackConfig::default(),
            audio: AudioConfig::default(),
            mp3: Mp3Config::default(),
            headset: HeadsetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Command socket settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frames with a larger payload are discarded and answered with an error
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Playback-control settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Playback-control thread polling interval
    pub poll_interval_ms: u64,
    /// Two Previous presses closer than this move back a track
    pub previous_threshold_ms: u64,
    /// Volume at startup (0.0 - 1.0)
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            previous_threshold_ms: 2000,
            initial_volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn previous_threshold(&self) -> Duration {
        Duration::from_millis(self.previous_threshold_ms)
    }
}

/// Audio output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name ("default" for the host default)
    pub device: String,
    /// Ring buffer length between renderer and device callback
    pub buffer_ms: u32,
    /// Frames requested from the source per decode call
    pub decode_chunk_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            buffer_ms: 200,
            decode_chunk_frames: 1152,
        }
    }
}

/// MP3 library settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Mp3Config {
    /// Accurate (sample exact) seeking instead of fuzzy seeking
    pub accurate_seek: bool,
}

/// Headset jack monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadsetConfig {
    /// GPIO value file; monitoring is disabled when unset
    pub gpio_value_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            gpio_value_path: None,
            poll_interval_ms: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("playd.db")
}

impl TomlConfig {
    /// Load from `path`, or defaults with a warning when the file is missing
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: TomlConfig = playd_common::config::load_or_default(path)
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.playback.initial_volume) {
            return Err(Error::Config(format!(
                "playback.initial_volume must be within 0.0..=1.0, got {}",
                self.playback.initial_volume
            )));
        }
        if self.audio.decode_chunk_frames == 0 {
            return Err(Error::Config(
                "audio.decode_chunk_frames must be positive".to_string(),
            ));
        }
        if self.audio.buffer_ms == 0 {
            return Err(Error::Config("audio.buffer_ms must be positive".to_string()));
        }
        if self.server.max_payload_bytes == 0 {
            return Err(Error::Config(
                "server.max_payload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Listen address for the command socket
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
