//! 32-band equalizer for the MP3 path
//!
//! [`EqualizerBands`] holds the shared per-band linear gains set over the
//! command socket. Each MP3 source owns an [`Equalizer`] that turns those
//! gains into a cascade of peaking biquads and rebuilds it whenever the
//! bands change.

use parking_lot::RwLock;
use playd_common::protocol::EQUALIZER_BANDS;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

const MIN_GAIN: f32 = 0.01;
const MAX_GAIN: f32 = 8.0;
const FLAT_TOLERANCE: f32 = 1e-3;

/// Shared band gains (1.0 = unchanged)
pub struct EqualizerBands {
    gains: RwLock<[f32; EQUALIZER_BANDS]>,
    generation: AtomicU64,
}

impl Default for EqualizerBands {
    fn default() -> Self {
        Self {
            gains: RwLock::new([1.0; EQUALIZER_BANDS]),
            generation: AtomicU64::new(0),
        }
    }
}

impl EqualizerBands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> [f32; EQUALIZER_BANDS] {
        *self.gains.read()
    }

    /// Replace all bands. Gains are clamped to a usable range; non-finite
    /// values reset the band to flat. Extra values are ignored and missing
    /// ones stay flat.
    pub fn set(&self, bands: &[f32]) {
        let mut gains = [1.0; EQUALIZER_BANDS];
        for (gain, value) in gains.iter_mut().zip(bands) {
            *gain = if value.is_finite() {
                value.clamp(MIN_GAIN, MAX_GAIN)
            } else {
                1.0
            };
        }
        *self.gains.write() = gains;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Reset every band to flat
    pub fn reset(&self) {
        self.set(&[1.0; EQUALIZER_BANDS]);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Biquad {
    /// RBJ peaking filter
    fn peaking(center_hz: f32, q: f32, gain: f32, sample_rate: f32) -> Self {
        let a = gain.sqrt();
        let w0 = 2.0 * PI * center_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }
}

/// Transposed direct form II state
#[derive(Debug, Clone, Copy, Default)]
struct FilterState {
    z1: f32,
    z2: f32,
}

impl FilterState {
    #[inline]
    fn process(&mut self, f: &Biquad, x: f32) -> f32 {
        let y = f.b0 * x + self.z1;
        self.z1 = f.b1 * x - f.a1 * y + self.z2;
        self.z2 = f.b2 * x - f.a2 * y;
        y
    }
}

/// Per-source filter cascade
pub struct Equalizer {
    bands: std::sync::Arc<EqualizerBands>,
    seen_generation: Option<u64>,
    sample_rate: u32,
    channels: usize,
    filters: Vec<Biquad>,
    /// `filters.len()` states per channel
    state: Vec<FilterState>,
}

impl Equalizer {
    pub fn new(bands: std::sync::Arc<EqualizerBands>, sample_rate: u32, channels: u16) -> Self {
        Self {
            bands,
            seen_generation: None,
            sample_rate,
            channels: channels.max(1) as usize,
            filters: Vec::new(),
            state: Vec::new(),
        }
    }

    fn rebuild(&mut self) {
        let gains = self.bands.get();
        let fs = self.sample_rate as f32;
        let band_width = fs / (2.0 * EQUALIZER_BANDS as f32);

        self.filters = gains
            .iter()
            .enumerate()
            .filter(|(_, gain)| (**gain - 1.0).abs() > FLAT_TOLERANCE)
            .map(|(i, gain)| {
                let center = (i as f32 + 0.5) * band_width;
                Biquad::peaking(center, i as f32 + 0.5, *gain, fs)
            })
            .collect();
        self.state = vec![FilterState::default(); self.filters.len() * self.channels];
    }

    /// True when every band is flat
    pub fn is_flat(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter interleaved samples in place
    pub fn process(&mut self, samples: &mut [i16]) {
        let generation = self.bands.generation();
        if self.seen_generation != Some(generation) {
            self.rebuild();
            self.seen_generation = Some(generation);
        }
        if self.filters.is_empty() {
            return;
        }

        let n_filters = self.filters.len();
        for frame in samples.chunks_exact_mut(self.channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let states = &mut self.state[ch * n_filters..(ch + 1) * n_filters];
                let mut x = *sample as f32 / 32768.0;
                for (filter, state) in self.filters.iter().zip(states.iter_mut()) {
                    x = state.process(filter, x);
                }
                *sample = (x * 32768.0).clamp(-32768.0, 32767.0) as i16;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_flat_bands_leave_samples_untouched() {
        let bands = Arc::new(EqualizerBands::new());
        let mut eq = Equalizer::new(bands, 44100, 2);
        let mut samples: Vec<i16> = (0..64).map(|i| (i * 300) as i16).collect();
        let original = samples.clone();

        eq.process(&mut samples);
        assert!(eq.is_flat());
        assert_eq!(samples, original);
    }

    #[test]
    fn test_set_clamps_and_bumps_generation() {
        let bands = EqualizerBands::new();
        let before = bands.generation();

        let mut gains = [1.0f32; EQUALIZER_BANDS];
        gains[0] = 100.0;
        gains[1] = -3.0;
        gains[2] = f32::NAN;
        bands.set(&gains);

        let stored = bands.get();
        assert_eq!(stored[0], MAX_GAIN);
        assert_eq!(stored[1], MIN_GAIN);
        assert_eq!(stored[2], 1.0);
        assert!(bands.generation() > before);
    }

    #[test]
    fn test_cut_reduces_low_band_energy() {
        let bands = Arc::new(EqualizerBands::new());
        let mut gains = [1.0f32; EQUALIZER_BANDS];
        gains[0] = MIN_GAIN;
        bands.set(&gains);

        // Mono tone in the middle of band 0 (44100 / 64 / 2 Hz)
        let freq = 344.5f32;
        let mut samples: Vec<i16> = (0..8192)
            .map(|n| ((2.0 * PI * freq * n as f32 / 44100.0).sin() * 16000.0) as i16)
            .collect();
        let energy_before: f64 = samples[4096..].iter().map(|s| (*s as f64).powi(2)).sum();

        let mut eq = Equalizer::new(bands, 44100, 1);
        eq.process(&mut samples);
        let energy_after: f64 = samples[4096..].iter().map(|s| (*s as f64).powi(2)).sum();

        assert!(energy_after < energy_before * 0.5);
    }
}
