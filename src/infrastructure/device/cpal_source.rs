//! Platform audio input through cpal
//!
//! cpal::Stream is not Send, so handles are opened on the capture worker
//! and the stream callback hands samples over a channel.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;

use crate::application::ports::{DeviceError, DeviceHandle, DeviceSource, OpenRequest};
use crate::domain::recording::RawFrame;

use super::describe_available;

/// Input device on the default cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSource;

impl CpalSource {
    pub fn new() -> Self {
        Self
    }

    /// Names of the input devices on the default host
    pub fn device_names() -> Result<Vec<String>, DeviceError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl DeviceSource for CpalSource {
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        let host = cpal::default_host();

        let device = match request.device.as_deref() {
            None => host
                .default_input_device()
                .ok_or(DeviceError::NoDefaultDevice)?,
            Some(name) => find_input_device(&host, name)?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::debug!("Using audio input device: {}", device_name);

        let channels = request.format.channel_count();
        let sample_rate = request.format.sample_rate();
        let sample_format = select_sample_format(&device, &device_name, channels, sample_rate)?;

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let failure = Arc::new(Mutex::new(None::<String>));

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, tx, failure.clone()),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, tx, failure.clone()),
            other => {
                tracing::debug!("Unsupported sample format: {:?}", other);
                return Err(DeviceError::UnsupportedConfig {
                    device: device_name,
                    channels,
                    sample_rate,
                });
            }
        }
        .map_err(|e| match e {
            BuildStreamError::DeviceNotAvailable => DeviceError::Busy(device_name.clone()),
            BuildStreamError::StreamConfigNotSupported => DeviceError::UnsupportedConfig {
                device: device_name.clone(),
                channels,
                sample_rate,
            },
            other => DeviceError::Backend(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(Box::new(CpalHandle {
            stream: Some(stream),
            samples: rx,
            pending: Vec::new(),
            frame_len: request.frame_samples * channels as usize,
            failure,
        }))
    }
}

struct CpalHandle {
    stream: Option<cpal::Stream>,
    samples: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    /// Interleaved samples per full frame
    frame_len: usize,
    failure: Arc<Mutex<Option<String>>>,
}

impl CpalHandle {
    fn take_frame(&mut self, len: usize) -> RawFrame {
        let frame = RawFrame::from_samples(&self.pending[..len]);
        self.pending.drain(..len);
        frame
    }
}

impl DeviceHandle for CpalHandle {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, DeviceError> {
        if let Some(message) = self.failure.lock().take() {
            return Err(DeviceError::StreamFailed(message));
        }

        let deadline = Instant::now() + timeout;
        let mut disconnected = false;
        while self.pending.len() < self.frame_len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.samples.recv_timeout(remaining) {
                Ok(data) => self.pending.extend_from_slice(&data),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if self.pending.len() >= self.frame_len {
            return Ok(Some(self.take_frame(self.frame_len)));
        }
        // Once the stream is gone the tail is delivered as a short frame
        if (disconnected || self.stream.is_none()) && !self.pending.is_empty() {
            let len = self.pending.len();
            return Ok(Some(self.take_frame(len)));
        }
        Ok(None)
    }

    fn halt(&mut self) {
        // Dropping the stream drops the callback and its sender
        self.stream = None;
    }

    fn close(&mut self) {
        self.stream = None;
        self.pending.clear();
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: mpsc::Sender<Vec<i16>>,
    failure: Arc<Mutex<Option<String>>>,
) -> Result<cpal::Stream, BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<i16> = data
                .iter()
                .map(|&s| <i16 as cpal::FromSample<T>>::from_sample_(s))
                .collect();
            // Receiver gone means the handle was closed
            let _ = tx.send(samples);
        },
        move |err| {
            tracing::error!("Audio stream error: {}", err);
            *failure.lock() = Some(err.to_string());
        },
        None,
    )
}

/// Pick a sample format the device offers for exactly this channel count
/// and rate. Prefers i16 over f32.
fn select_sample_format(
    device: &cpal::Device,
    device_name: &str,
    channels: u16,
    sample_rate: u32,
) -> Result<SampleFormat, DeviceError> {
    let configs = device
        .supported_input_configs()
        .map_err(|e| DeviceError::Backend(format!("Failed to get configs: {}", e)))?;

    let mut best: Option<SampleFormat> = None;
    for range in configs {
        if range.channels() != channels
            || range.min_sample_rate().0 > sample_rate
            || range.max_sample_rate().0 < sample_rate
        {
            continue;
        }
        match range.sample_format() {
            SampleFormat::I16 => return Ok(SampleFormat::I16),
            SampleFormat::F32 => best = Some(SampleFormat::F32),
            _ => {}
        }
    }

    best.ok_or_else(|| DeviceError::UnsupportedConfig {
        device: device_name.to_string(),
        channels,
        sample_rate,
    })
}

/// Find an input device by name.
///
/// Matching strategy (in order):
/// 1. Exact match (case-sensitive)
/// 2. Exact match (case-insensitive)
/// 3. Substring match (case-insensitive)
fn find_input_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, DeviceError> {
    let devices: Vec<(String, cpal::Device)> = host
        .input_devices()
        .map_err(|e| DeviceError::Backend(e.to_string()))?
        .filter_map(|d| d.name().ok().map(|name| (name, d)))
        .collect();

    let names: Vec<String> = devices.iter().map(|(name, _)| name.clone()).collect();

    match match_device_name(&names, device_name) {
        Some(index) => {
            tracing::debug!(
                "Matched audio device {} (searched for: {})",
                names[index],
                device_name
            );
            devices
                .into_iter()
                .nth(index)
                .map(|(_, device)| device)
                .ok_or(DeviceError::NoDefaultDevice)
        }
        None => Err(DeviceError::NotFound {
            requested: device_name.to_string(),
            available: describe_available(&names),
        }),
    }
}

/// Index of the best match for `requested` in `names`
pub(crate) fn match_device_name(names: &[String], requested: &str) -> Option<usize> {
    let search_lower = requested.to_lowercase();

    names
        .iter()
        .position(|name| name == requested)
        .or_else(|| {
            names
                .iter()
                .position(|name| name.to_lowercase() == search_lower)
        })
        .or_else(|| {
            names
                .iter()
                .position(|name| name.to_lowercase().contains(&search_lower))
        })
}
