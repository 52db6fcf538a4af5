//! FLAC decoder source
//!
//! FLAC decodes one block at a time; blocks that do not fit the caller's
//! buffer are held back and drained on the next call. Seeking is always
//! sample accurate. The equalizer does not apply on this path.

use super::stream::PacketStream;
use super::Source;
use crate::error::Result;
use std::path::Path;
use symphonia::core::formats::SeekMode;

pub struct FlacSource {
    stream: PacketStream,
}

impl FlacSource {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            stream: PacketStream::open(path, SeekMode::Accurate)?,
        })
    }
}

impl Source for FlacSource {
    fn decode(&mut self, buf: &mut [u8]) -> usize {
        self.stream.fill_with(buf, |_| {})
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
