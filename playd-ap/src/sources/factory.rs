//! Source factory
//!
//! Picks a decoder variant from the file extension. Anything that cannot be
//! opened, or opens into an invalid source, comes back as `None` and the
//! service skips the track.

use super::{Codec, FlacSource, Mp3Library, Mp3Source, Source};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Opens decoder sources for file paths
pub trait SourceOpener: Send + Sync {
    fn make_source(&self, path: &Path) -> Option<Box<dyn Source>>;
}

/// Production opener for MP3 and FLAC files
pub struct SourceFactory {
    mp3: Arc<Mp3Library>,
}

impl SourceFactory {
    pub fn new(mp3: Arc<Mp3Library>) -> Self {
        Self { mp3 }
    }
}

impl SourceOpener for SourceFactory {
    fn make_source(&self, path: &Path) -> Option<Box<dyn Source>> {
        let Some(codec) = Codec::from_path(path) else {
            warn!("Unsupported file type: {}", path.display());
            return None;
        };

        let opened: crate::Result<Box<dyn Source>> = match codec {
            Codec::Mp3 => Mp3Source::open(path, &self.mp3).map(|s| Box::new(s) as Box<dyn Source>),
            Codec::Flac => FlacSource::open(path).map(|s| Box::new(s) as Box<dyn Source>),
        };

        match opened {
            Ok(source) if source.valid() => Some(source),
            Ok(_) => {
                warn!("Invalid {} source: {}", codec.extension(), path.display());
                None
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                None
            }
        }
    }
}
