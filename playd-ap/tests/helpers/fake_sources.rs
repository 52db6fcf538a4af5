//! Synthetic sources for service tests
//!
//! `FakeOpener` hands out `ToneSource`s for any path except ones whose file
//! stem is `broken`, and records every path it was asked to open. Opening
//! a path can be made slow to widen the window where the playback thread
//! holds no lock.

use parking_lot::Mutex;
use playd_ap::audio::OutputControl;
use playd_ap::service::{MainService, ServiceSettings};
use playd_ap::sources::{EqualizerBands, Source, SourceOpener, BYTES_PER_SAMPLE};
use playd_ap::store::MemoryTrackStore;
use playd_common::{TrackId, TrackInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Length of every synthetic track, one second at 44.1 kHz
pub const TRACK_FRAMES: u64 = 44_100;

/// Stereo ramp whose sample values encode the frame index
pub struct ToneSource {
    sample_rate: u32,
    channels: u16,
    total: u64,
    position: u64,
}

impl ToneSource {
    pub fn new(sample_rate: u32, channels: u16, total: u64) -> Self {
        Self {
            sample_rate,
            channels,
            total,
            position: 0,
        }
    }
}

impl Source for ToneSource {
    fn decode(&mut self, buf: &mut [u8]) -> usize {
        let frame_bytes = self.frame_bytes();
        let frames = ((buf.len() / frame_bytes) as u64).min(self.total - self.position);
        let mut written = 0;
        for _ in 0..frames {
            let value = (self.position % 1024) as i16;
            for _ in 0..self.channels {
                buf[written..written + BYTES_PER_SAMPLE].copy_from_slice(&value.to_le_bytes());
                written += BYTES_PER_SAMPLE;
            }
            self.position += 1;
        }
        written
    }

    fn seek(&mut self, frame: u64) {
        self.position = frame.min(self.total);
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn done(&self) -> bool {
        self.position >= self.total
    }

    fn valid(&self) -> bool {
        true
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn total_frames(&self) -> u64 {
        self.total
    }
}

#[derive(Default)]
pub struct FakeOpener {
    opened: Mutex<Vec<PathBuf>>,
    delays: Mutex<Vec<(PathBuf, Duration)>>,
}

impl FakeOpener {
    /// Paths opened so far, including failed attempts
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Make every open of `path` take `delay`
    pub fn delay_open(&self, path: impl Into<PathBuf>, delay: Duration) {
        self.delays.lock().push((path.into(), delay));
    }
}

impl SourceOpener for FakeOpener {
    fn make_source(&self, path: &Path) -> Option<Box<dyn Source>> {
        self.opened.lock().push(path.to_path_buf());
        let delay = self
            .delays
            .lock()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if path.file_stem().and_then(|s| s.to_str()) == Some("broken") {
            return None;
        }
        Some(Box::new(ToneSource::new(44_100, 2, TRACK_FRAMES)))
    }
}

/// Build a service over synthetic sources.
///
/// Every id in `tracks` resolves to `/music/<id>.flac`; ids in `broken`
/// resolve to a path the opener refuses. Ids in neither are unknown to the
/// store.
pub fn service_with_tracks(
    tracks: &[i32],
    broken: &[i32],
) -> (Arc<MainService>, Arc<FakeOpener>) {
    let store = Arc::new(MemoryTrackStore::new());
    for &id in tracks {
        store.insert(
            TrackInfo {
                id: TrackId(id),
                title: format!("Track {}", id),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                duration_secs: 1,
            },
            format!("/music/{}.flac", id),
        );
    }
    for &id in broken {
        store.insert(TrackInfo::unknown(TrackId(id)), format!("/music/{}/broken.flac", id));
    }

    let opener = Arc::new(FakeOpener::default());
    let service = Arc::new(MainService::new(
        Arc::clone(&opener) as Arc<dyn SourceOpener>,
        store,
        Arc::new(OutputControl::new(1.0)),
        Arc::new(EqualizerBands::new()),
        ServiceSettings {
            poll_interval: Duration::from_millis(5),
            previous_threshold: Duration::from_secs(2),
        },
    ));
    (service, opener)
}
