//! PCM ring between the renderer thread and the device callback
//!
//! Holds interleaved f32 samples already in the device layout. The writer
//! only ever pushes whole frames, so the reader stays frame aligned.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::volume::VolumeControl;

/// Output-side controls shared by the service, the renderer and the callback
pub struct OutputControl {
    paused: AtomicBool,
    flush: AtomicBool,
    underruns: AtomicU64,
    pub volume: VolumeControl,
}

impl OutputControl {
    pub fn new(initial_volume: f32) -> Self {
        Self {
            paused: AtomicBool::new(false),
            flush: AtomicBool::new(false),
            underruns: AtomicU64::new(0),
            volume: VolumeControl::new(initial_volume),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Ask the callback to drop everything buffered
    pub fn request_flush(&self) {
        self.flush.store(true, Ordering::Release);
    }

    pub fn flush_pending(&self) -> bool {
        self.flush.load(Ordering::Acquire)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Create a ring holding `capacity` samples
pub fn pcm_ring(capacity: usize, control: Arc<OutputControl>) -> (PcmWriter, PcmReader) {
    let (prod, cons) = HeapRb::<f32>::new(capacity.max(1)).split();
    (
        PcmWriter { prod },
        PcmReader {
            cons,
            control,
        },
    )
}

/// Producer half (renderer thread)
pub struct PcmWriter {
    prod: HeapProd<f32>,
}

impl PcmWriter {
    pub fn vacant(&self) -> usize {
        self.prod.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.prod.capacity().into()
    }

    /// Push as many samples as fit
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.prod.push_slice(samples)
    }
}

/// Consumer half (device callback)
pub struct PcmReader {
    cons: HeapCons<f32>,
    control: Arc<OutputControl>,
}

impl PcmReader {
    /// Fill `out` for the device: silence while paused (nothing consumed),
    /// volume applied, silence on underrun
    pub fn fill(&mut self, out: &mut [f32]) {
        if self.control.flush.swap(false, Ordering::AcqRel) {
            self.cons.clear();
        }

        if self.control.is_paused() {
            out.fill(0.0);
            return;
        }

        let n = self.cons.pop_slice(out);
        let volume = self.control.volume.effective();
        for sample in &mut out[..n] {
            *sample = (*sample * volume).clamp(-1.0, 1.0);
        }

        if n < out.len() {
            out[n..].fill(0.0);
            if n > 0 {
                let count = self.control.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 100 == 0 {
                    trace!("Output underrun (total: {})", count);
                }
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.cons.occupied_len()
    }
}
