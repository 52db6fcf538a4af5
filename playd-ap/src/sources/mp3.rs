//! MP3 decoder source
//!
//! MP3 decoding is gated by a process-wide [`Mp3Library`] capability. It is
//! acquired once at service start, injected into every [`Mp3Source`], and
//! released once at shutdown. The capability carries the seek mode and the
//! shared equalizer bands.

use super::equalizer::{Equalizer, EqualizerBands};
use super::stream::PacketStream;
use super::Source;
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use symphonia::core::formats::SeekMode;
use tracing::{debug, info};

static LIBRARY_HELD: AtomicBool = AtomicBool::new(false);

/// Process-wide MP3 decoding capability
pub struct Mp3Library {
    accurate_seek: bool,
    equalizer: Arc<EqualizerBands>,
    released: AtomicBool,
}

impl Mp3Library {
    /// Acquire the library. Fails while another handle is held.
    pub fn acquire(accurate_seek: bool, equalizer: Arc<EqualizerBands>) -> Result<Arc<Self>> {
        if LIBRARY_HELD
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Codec("MP3 library already initialized".to_string()));
        }

        info!(
            "MP3 library initialized ({} seeking)",
            if accurate_seek { "accurate" } else { "fuzzy" }
        );
        Ok(Arc::new(Self {
            accurate_seek,
            equalizer,
            released: AtomicBool::new(false),
        }))
    }

    /// Release the library. Later calls are no-ops.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            LIBRARY_HELD.store(false, Ordering::Release);
            info!("MP3 library released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn accurate_seek(&self) -> bool {
        self.accurate_seek
    }

    pub fn equalizer(&self) -> &Arc<EqualizerBands> {
        &self.equalizer
    }

    fn seek_mode(&self) -> SeekMode {
        if self.accurate_seek {
            SeekMode::Accurate
        } else {
            SeekMode::Coarse
        }
    }
}

impl Drop for Mp3Library {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct Mp3Source {
    stream: PacketStream,
    equalizer: Equalizer,
}

impl Mp3Source {
    pub fn open(path: &Path, library: &Mp3Library) -> Result<Self> {
        if library.is_released() {
            return Err(Error::Codec("MP3 library has been released".to_string()));
        }

        let stream = PacketStream::open(path, library.seek_mode())?;
        let equalizer = Equalizer::new(
            Arc::clone(library.equalizer()),
            stream.sample_rate(),
            stream.channels(),
        );
        debug!("MP3 source ready: {}", path.display());

        Ok(Self { stream, equalizer })
    }
}

impl Source for Mp3Source {
    fn decode(&mut self, buf: &mut [u8]) -> usize {
        let equalizer = &mut self.equalizer;
        self.stream.fill_with(buf, |samples| equalizer.process(samples))
    }

    fn seek(&mut self, frame: u64) {
        self.stream.seek(frame);
    }

    fn tell(&self) -> u64 {
        self.stream.tell()
    }

    fn done(&self) -> bool {
        self.stream.done()
    }

    fn valid(&self) -> bool {
        self.stream.valid()
    }

    fn sample_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.stream.channels()
    }

    fn total_frames(&self) -> u64 {
        self.stream.total_frames()
    }
}
