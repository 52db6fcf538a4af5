//! Audio output using cpal
//!
//! The device is opened once per process and fed from the PCM ring. The
//! callback never blocks: it drains the ring, applies volume and plays
//! silence while paused or on underrun.

use super::ring::PcmReader;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Device name meaning "the host's default output"
pub const DEFAULT_DEVICE: &str = "default";

pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available output device names
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: device to open; [`DEFAULT_DEVICE`] or an unknown name
    ///   falls back to the host default
    ///
    /// # Errors
    /// No usable device, or its configuration cannot be read
    pub fn open(device_name: &str) -> Result<Self> {
        let host = cpal::default_host();

        let requested = if device_name == DEFAULT_DEVICE {
            None
        } else {
            host.output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
                .find(|d| d.name().ok().as_deref() == Some(device_name))
        };

        let device = match requested {
            Some(device) => {
                info!("Found requested audio device: {}", device_name);
                device
            }
            None => {
                if device_name != DEFAULT_DEVICE {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        device_name
                    );
                }
                let device = host
                    .default_output_device()
                    .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
                info!(
                    "Using default audio device: {}",
                    device.name().unwrap_or_else(|_| "Unknown".to_string())
                );
                device
            }
        };

        let (config, sample_format) = Self::get_best_config(&device)?;
        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Prefer 44.1kHz stereo f32, else the device default
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= 44100
                && config.max_sample_rate().0 >= 44100
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(44100))
                .config();
            return Ok((config, sample_format));
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    /// Start the stream, draining `reader` from the device callback
    pub fn start(&mut self, reader: PcmReader) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, _>(reader, |s| s)?,
            SampleFormat::I16 => self.build_stream::<i16, _>(reader, |s| (s * i16::MAX as f32) as i16)?,
            SampleFormat::U16 => {
                self.build_stream::<u16, _>(reader, |s| ((s + 1.0) * 32767.5) as u16)?
            }
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        info!("Audio stream started");
        Ok(())
    }

    fn build_stream<T, F>(&self, mut reader: PcmReader, convert: F) -> Result<Stream>
    where
        T: SizedSample + Send + 'static,
        F: Fn(f32) -> T + Send + 'static,
    {
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let mut scratch: Vec<f32> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    reader.fill(&mut scratch);
                    for (dst, sample) in data.iter_mut().zip(&scratch) {
                        *dst = convert(*sample);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop and drop the stream. Safe to call more than once.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// True once the stream has reported an error
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
