//! Streaming sample rate conversion using rubato
//!
//! One [`StreamResampler`] lives per active source. Input arrives in
//! arbitrary sized pieces and is accumulated until rubato's fixed input
//! chunk is available. Anything shorter than one chunk left over when the
//! source changes is dropped.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

pub struct StreamResampler {
    inner: Option<FastFixedIn<f32>>,
    input_rate: u32,
    channels: usize,
    planar_in: Vec<Vec<f32>>,
}

impl StreamResampler {
    /// Converter from `input_rate` to `output_rate` for interleaved audio
    /// with `channels` channels. Equal rates pass samples straight through.
    pub fn new(input_rate: u32, output_rate: u32, channels: u16, chunk_frames: usize) -> Result<Self> {
        let channels = channels.max(1) as usize;

        let inner = if input_rate == output_rate {
            None
        } else {
            debug!(
                "Resampling from {}Hz to {}Hz ({} channels)",
                input_rate, output_rate, channels
            );
            Some(
                FastFixedIn::<f32>::new(
                    output_rate as f64 / input_rate as f64,
                    1.0,
                    PolynomialDegree::Septic,
                    chunk_frames.max(1),
                    channels,
                )
                .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?,
            )
        };

        Ok(Self {
            inner,
            input_rate,
            channels,
            planar_in: vec![Vec::new(); channels],
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Feed interleaved samples; converted output is appended to `out`
    pub fn process(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            out.extend_from_slice(interleaved);
            return Ok(());
        };

        for frame in interleaved.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.planar_in[ch].push(*sample);
            }
        }

        loop {
            let needed = inner.input_frames_next();
            if self.planar_in[0].len() < needed {
                break;
            }

            let chunk: Vec<&[f32]> = self.planar_in.iter().map(|c| &c[..needed]).collect();
            let planar_out = inner
                .process(&chunk, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

            let frames = planar_out.first().map_or(0, |c| c.len());
            out.reserve(frames * self.channels);
            for i in 0..frames {
                for channel in &planar_out {
                    out.push(channel[i]);
                }
            }

            for channel in &mut self.planar_in {
                channel.drain(..needed);
            }
        }
        Ok(())
    }
}

/// Map interleaved frames from `src` channels to `dst` channels.
///
/// Mono is copied to every output channel; anything mixed down to mono is
/// averaged; otherwise channels are matched by index and extra output
/// channels stay silent.
pub fn map_channels(input: &[f32], src: usize, dst: usize, out: &mut Vec<f32>) {
    if src == dst {
        out.extend_from_slice(input);
        return;
    }

    let frames = input.len() / src.max(1);
    out.reserve(frames * dst);
    for frame in input.chunks_exact(src) {
        if src == 1 {
            out.extend(std::iter::repeat(frame[0]).take(dst));
        } else if dst == 1 {
            out.push(frame.iter().sum::<f32>() / src as f32);
        } else {
            for ch in 0..dst {
                out.push(frame.get(ch).copied().unwrap_or(0.0));
            }
        }
    }
}
