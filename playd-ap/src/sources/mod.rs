//! Decoder sources
//!
//! A [`Source`] turns one encoded audio file into interleaved 16-bit PCM
//! pulled on demand by the renderer. MP3 and FLAC are the two variants; the
//! [`factory`] picks one from the file extension.

pub mod equalizer;
pub mod factory;
pub mod flac;
pub mod mp3;
mod stream;

pub use equalizer::{Equalizer, EqualizerBands};
pub use factory::{SourceFactory, SourceOpener};
pub use flac::FlacSource;
pub use mp3::{Mp3Library, Mp3Source};

use std::path::Path;

/// Bytes per interleaved sample (signed 16-bit little endian)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Uniform pull interface over a codec-specific decoder
pub trait Source: Send {
    /// Fill `buf` with interleaved little-endian i16 PCM.
    ///
    /// Only whole frames are written. Returns the number of bytes written;
    /// 0 means the stream is exhausted and [`Source::done`] is now true.
    fn decode(&mut self, buf: &mut [u8]) -> usize;

    /// Reposition to an absolute sample frame, clamped to the stream length
    /// when that is known
    fn seek(&mut self, frame: u64);

    /// Absolute index of the next frame `decode` will emit
    fn tell(&self) -> u64;

    fn done(&self) -> bool;

    /// False when the stream could not be set up; an invalid source is never
    /// handed to the renderer
    fn valid(&self) -> bool;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Stream length in frames, 0 when unknown
    fn total_frames(&self) -> u64;

    /// Bytes per interleaved frame
    fn frame_bytes(&self) -> usize {
        self.channels() as usize * BYTES_PER_SAMPLE
    }
}

/// Codec variants, selected purely by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    Flac,
}

impl Codec {
    /// Case-insensitive match on the extension of `path`
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("mp3") {
            Some(Codec::Mp3)
        } else if ext.eq_ignore_ascii_case("flac") {
            Some(Codec::Flac)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Flac => "flac",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_from_extension() {
        assert_eq!(Codec::from_path(Path::new("/music/a.mp3")), Some(Codec::Mp3));
        assert_eq!(Codec::from_path(Path::new("/music/a.MP3")), Some(Codec::Mp3));
        assert_eq!(Codec::from_path(Path::new("b.FlAc")), Some(Codec::Flac));
        assert_eq!(Codec::from_path(Path::new("c.ogg")), None);
        assert_eq!(Codec::from_path(Path::new("no_extension")), None);
    }
}
