//! Headset watcher
//!
//! Polls the headset-detect line and pauses playback when the headset is
//! pulled. The line reads low with a headset plugged in; a low to high edge
//! is an unplug. Plugging back in does not resume.

use super::MainService;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A readable headset-detect line
pub trait HeadsetPad: Send {
    /// True when the line is high
    fn read_level(&mut self) -> Result<bool>;
}

/// GPIO exposed through a sysfs `value` file
pub struct SysfsGpioPad {
    path: PathBuf,
}

impl SysfsGpioPad {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HeadsetPad for SysfsGpioPad {
    fn read_level(&mut self) -> Result<bool> {
        let raw = std::fs::read_to_string(&self.path)?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(Error::Internal(format!(
                "Unexpected GPIO value '{}' in {}",
                other,
                self.path.display()
            ))),
        }
    }
}

/// Edge detector over successive line readings
#[derive(Debug, Default)]
pub struct HeadsetWatcher {
    last: Option<bool>,
}

impl HeadsetWatcher {
    /// Feed a reading; true on an unplug edge
    pub fn observe(&mut self, level: bool) -> bool {
        let unplugged = self.last == Some(false) && level;
        self.last = Some(level);
        unplugged
    }
}

/// Poll `pad` until exit, pausing the service on unplug
pub fn run(mut pad: Box<dyn HeadsetPad>, service: Arc<MainService>, poll_interval: Duration) {
    info!("Headset thread started");
    let mut watcher = HeadsetWatcher::default();
    let mut failing = false;

    while !service.exit_requested() {
        match pad.read_level() {
            Ok(level) => {
                if failing {
                    debug!("Headset line readable again");
                    failing = false;
                }
                if watcher.observe(level) {
                    service.headset_unplugged();
                }
            }
            Err(e) => {
                if !failing {
                    warn!("Headset line read failed: {}", e);
                    failing = true;
                }
            }
        }
        std::thread::sleep(poll_interval);
    }
    info!("Headset thread stopped");
}
