//! Packet-at-a-time decoding shared by the codec sources
//!
//! Symphonia hands back one decoded packet (an MP3 frame or a FLAC block)
//! at a time. [`PacketStream`] keeps the samples of the last packet that did
//! not fit in the caller's buffer and drains them first on the next call, so
//! nothing is dropped between `decode` calls.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::BYTES_PER_SAMPLE;

// A decode error on a single packet is skipped; more than this many in a row
// ends the stream.
const MAX_DECODE_RETRIES: usize = 3;

pub(crate) struct PacketStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
    seek_mode: SeekMode,
    sample_buf: Option<SampleBuffer<i16>>,
    /// Samples of the last decoded packet not yet handed out
    pending: Vec<i16>,
    pending_pos: usize,
    /// Frames still to drop after an accurate seek landed early
    skip_frames: u64,
    position: u64,
    decode_errors: usize,
    done: bool,
}

impl PacketStream {
    /// Probe `path` and set up a decoder for its first audio track
    pub(crate) fn open(path: &Path, seek_mode: SeekMode) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open {}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe {}: {}", path.display(), e)))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode(format!("No audio track in {}", path.display())))?;

        let track_id = track.id;
        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;
        let total_frames = params.n_frames.unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        debug!(
            "Opened {}: {} Hz, {} channels, {} frames",
            path.display(),
            sample_rate,
            channels,
            total_frames
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            total_frames,
            seek_mode,
            sample_buf: None,
            pending: Vec::new(),
            pending_pos: 0,
            skip_frames: 0,
            position: 0,
            decode_errors: 0,
            done: false,
        })
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    pub(crate) fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub(crate) fn tell(&self) -> u64 {
        self.position
    }

    pub(crate) fn done(&self) -> bool {
        self.done
    }

    pub(crate) fn valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    /// Fill `buf` with whole frames of LE i16 PCM.
    ///
    /// `post` runs once over the samples of every freshly decoded packet,
    /// before any of them are copied out.
    pub(crate) fn fill_with<F>(&mut self, buf: &mut [u8], mut post: F) -> usize
    where
        F: FnMut(&mut [i16]),
    {
        let channels = self.channels as usize;
        let frame_bytes = channels * BYTES_PER_SAMPLE;
        let mut written = 0;

        loop {
            let room_frames = (buf.len() - written) / frame_bytes;
            if room_frames == 0 {
                break;
            }

            let pending_frames = (self.pending.len() - self.pending_pos) / channels;
            if pending_frames == 0 {
                if self.done || !self.next_packet() {
                    break;
                }
                let fresh = &mut self.pending[self.pending_pos..];
                post(fresh);
                continue;
            }

            let frames = room_frames.min(pending_frames);
            let samples = &self.pending[self.pending_pos..self.pending_pos + frames * channels];
            let out = &mut buf[written..written + frames * frame_bytes];
            for (dst, sample) in out.chunks_exact_mut(BYTES_PER_SAMPLE).zip(samples) {
                dst.copy_from_slice(&sample.to_le_bytes());
            }

            self.pending_pos += frames * channels;
            self.position += frames as u64;
            written += frames * frame_bytes;
        }

        written
    }

    /// Decode the next packet of our track into `pending`.
    /// Returns false once the stream is exhausted.
    fn next_packet(&mut self) -> bool {
        let channels = self.channels as usize;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream at frame {}", self.position);
                    self.done = true;
                    return false;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    self.done = true;
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    self.decode_errors = 0;
                    if decoded.frames() == 0 {
                        continue;
                    }

                    let spec = *decoded.spec();
                    let needed = decoded.capacity() * spec.channels.count();
                    let sample_buf = match self.sample_buf.take() {
                        Some(b) if b.capacity() >= needed => b,
                        _ => SampleBuffer::<i16>::new(decoded.capacity() as u64, spec),
                    };
                    let sample_buf = self.sample_buf.insert(sample_buf);
                    sample_buf.copy_interleaved_ref(decoded);

                    let samples = sample_buf.samples();
                    let frames = (samples.len() / channels) as u64;
                    let skip = self.skip_frames.min(frames);
                    self.skip_frames -= skip;

                    self.pending.clear();
                    self.pending
                        .extend_from_slice(&samples[skip as usize * channels..]);
                    self.pending_pos = 0;

                    if self.pending.is_empty() {
                        continue;
                    }
                    return true;
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    self.decode_errors += 1;
                    warn!("Decode error ({} in a row): {}", self.decode_errors, e);
                    if self.decode_errors > MAX_DECODE_RETRIES {
                        self.done = true;
                        return false;
                    }
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.done = true;
                    return false;
                }
                Err(e) => {
                    warn!("Unrecoverable decode error: {}", e);
                    self.done = true;
                    return false;
                }
            }
        }
    }

    /// Reposition to `frame`, clamped to the stream length when known
    pub(crate) fn seek(&mut self, frame: u64) {
        let target = if self.total_frames > 0 {
            frame.min(self.total_frames)
        } else {
            frame
        };

        self.pending.clear();
        self.pending_pos = 0;
        self.skip_frames = 0;
        self.decode_errors = 0;

        if self.total_frames > 0 && target >= self.total_frames {
            self.position = self.total_frames;
            self.done = true;
            return;
        }

        let seeked = self.format.seek(
            self.seek_mode,
            SeekTo::TimeStamp {
                ts: target,
                track_id: self.track_id,
            },
        );

        match seeked {
            Ok(seeked) => {
                self.decoder.reset();
                self.done = false;
                match self.seek_mode {
                    SeekMode::Accurate => {
                        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
                        self.position = seeked.required_ts;
                    }
                    SeekMode::Coarse => {
                        self.position = seeked.actual_ts;
                    }
                }
                debug!(
                    "Seeked to frame {} (requested {}, landed {})",
                    self.position, target, seeked.actual_ts
                );
            }
            Err(e) => {
                // Position is unknown after a failed seek; treat as end of stream
                warn!("Seek to frame {} failed: {}", target, e);
                self.done = true;
            }
        }
    }
}
