//! Audio output path
//!
//! ```text
//! active source --decode--> renderer thread --f32--> PCM ring --> cpal callback
//! ```
//!
//! The renderer converts to the device layout (channels, sample rate); the
//! callback applies pause, flush and volume.

pub mod output;
pub mod renderer;
pub mod resampler;
pub mod ring;
pub mod slot;
pub mod volume;

pub use output::AudioOutput;
pub use renderer::{AudioRenderer, DeviceFormat, RenderOutcome};
pub use ring::{pcm_ring, OutputControl, PcmReader, PcmWriter};
pub use slot::{ActiveSource, Origin, SourceSlot};
pub use volume::VolumeControl;

/// Ring length in samples for `buffer_ms` of device audio, never shorter
/// than two decode chunks
pub fn ring_capacity(buffer_ms: u32, device: DeviceFormat, chunk_frames: usize) -> usize {
    let channels = device.channels.max(1) as usize;
    let from_ms = device.sample_rate as usize * buffer_ms as usize / 1000 * channels;
    from_ms.max(2 * chunk_frames * channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_capacity() {
        let device = DeviceFormat {
            sample_rate: 48000,
            channels: 2,
        };
        assert_eq!(ring_capacity(200, device, 1152), 19200);
        assert_eq!(ring_capacity(1, device, 1152), 4608);
    }
}
