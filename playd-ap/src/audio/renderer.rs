//! Renderer thread
//!
//! Pulls PCM from the active source, converts it to the device layout and
//! feeds the output ring. Waits only on ring space; idles when there is no
//! source or the source has finished.

use super::resampler::{map_channels, StreamResampler};
use super::ring::{OutputControl, PcmWriter};
use super::slot::SourceSlot;
use crate::playback::PlaybackIntent;
use crate::sources::BYTES_PER_SAMPLE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const BUSY_WAIT: Duration = Duration::from_millis(5);
const IDLE_WAIT: Duration = Duration::from_millis(10);

/// Result of one renderer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Audio was pushed into the ring
    Rendered,
    /// No active source
    Idle,
    /// Ring full or a flush is still pending
    BufferFull,
    /// Active source is exhausted
    Finished,
}

/// Device layout the renderer converts to
#[derive(Debug, Clone, Copy)]
pub struct DeviceFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

pub struct AudioRenderer {
    slot: Arc<SourceSlot>,
    control: Arc<OutputControl>,
    writer: PcmWriter,
    device: DeviceFormat,
    chunk_frames: usize,
    scratch: Vec<u8>,
    converted: Vec<f32>,
    mapped: Vec<f32>,
    /// Device-ready samples not yet pushed, tagged with the slot generation
    pending: Vec<f32>,
    pending_generation: u64,
    /// Resampler for the current generation
    resampler: Option<(u64, StreamResampler)>,
}

impl AudioRenderer {
    pub fn new(
        slot: Arc<SourceSlot>,
        control: Arc<OutputControl>,
        writer: PcmWriter,
        device: DeviceFormat,
        chunk_frames: usize,
    ) -> Self {
        Self {
            slot,
            control,
            writer,
            device,
            chunk_frames: chunk_frames.max(1),
            scratch: Vec::new(),
            converted: Vec::new(),
            mapped: Vec::new(),
            pending: Vec::new(),
            pending_generation: 0,
            resampler: None,
        }
    }

    /// Run until exit is requested
    pub fn run(mut self, intent: Arc<PlaybackIntent>) {
        info!(
            "Renderer started ({} Hz, {} channels)",
            self.device.sample_rate, self.device.channels
        );
        while !intent.should_exit() {
            match self.render_once() {
                RenderOutcome::Rendered => {}
                RenderOutcome::BufferFull => std::thread::sleep(BUSY_WAIT),
                RenderOutcome::Idle | RenderOutcome::Finished => std::thread::sleep(IDLE_WAIT),
            }
        }
        info!("Renderer stopped");
    }

    /// One step: push held-back audio, or decode one chunk and push it
    pub fn render_once(&mut self) -> RenderOutcome {
        if self.control.flush_pending() {
            return RenderOutcome::BufferFull;
        }

        if !self.pending.is_empty() {
            match self.push_pending() {
                Push::Drained => return RenderOutcome::Rendered,
                Push::Held => return RenderOutcome::BufferFull,
                Push::Stale => {}
            }
        }

        // Only decode when a chunk is likely to fit
        let chunk_samples = self.chunk_frames * self.device.channels as usize;
        if self.writer.vacant() < chunk_samples.min(self.writer.capacity()) {
            return RenderOutcome::BufferFull;
        }

        let (bytes, generation, rate, channels) = {
            let mut guard = self.slot.lock();
            let Some(active) = guard.as_mut() else {
                return RenderOutcome::Idle;
            };
            if self.slot.is_finished() {
                return RenderOutcome::Finished;
            }

            let frame_bytes = active.source.frame_bytes().max(BYTES_PER_SAMPLE);
            self.scratch.resize(self.chunk_frames * frame_bytes, 0);
            let bytes = active.source.decode(&mut self.scratch);
            self.slot.update_position(active.source.tell());

            if bytes == 0 {
                self.slot.mark_finished();
                debug!("Track {} finished", active.track);
                return RenderOutcome::Finished;
            }
            (
                bytes,
                self.slot.generation(),
                active.source.sample_rate(),
                active.source.channels(),
            )
        };

        self.converted.clear();
        self.converted.extend(
            self.scratch[..bytes]
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0),
        );

        self.mapped.clear();
        map_channels(
            &self.converted,
            channels as usize,
            self.device.channels as usize,
            &mut self.mapped,
        );

        let resampler = match self.resampler.take() {
            Some((gen, r)) if gen == generation && r.input_rate() == rate => r,
            _ => match StreamResampler::new(
                rate,
                self.device.sample_rate,
                self.device.channels,
                self.chunk_frames,
            ) {
                Ok(r) => r,
                Err(e) => {
                    warn!("{}", e);
                    return RenderOutcome::Idle;
                }
            },
        };
        let (_, resampler) = self.resampler.insert((generation, resampler));

        if let Err(e) = resampler.process(&self.mapped, &mut self.pending) {
            warn!("{}", e);
            self.pending.clear();
            return RenderOutcome::Rendered;
        }
        self.pending_generation = generation;

        self.push_pending();
        RenderOutcome::Rendered
    }

    /// Push the whole frames of `pending` that fit.
    ///
    /// Runs under the source lock. Swaps and seeks request their flush under
    /// that lock before moving the generation, so output checked here can
    /// neither land ahead of a flush nor belong to a replaced source.
    fn push_pending(&mut self) -> Push {
        let slot = Arc::clone(&self.slot);
        let _guard = slot.lock();

        if self.pending_generation != slot.generation() {
            self.pending.clear();
            return Push::Stale;
        }
        if self.control.flush_pending() {
            return Push::Held;
        }

        let channels = self.device.channels.max(1) as usize;
        let fit = (self.writer.vacant() / channels) * channels;
        let n = fit.min(self.pending.len());
        if n > 0 {
            let pushed = self.writer.push(&self.pending[..n]);
            self.pending.drain(..pushed);
        }
        if self.pending.is_empty() {
            Push::Drained
        } else {
            Push::Held
        }
    }
}

enum Push {
    /// Everything held back is in the ring
    Drained,
    /// Ring full or a flush not yet taken by the callback
    Held,
    /// Output belonged to an older generation and was dropped
    Stale,
}
