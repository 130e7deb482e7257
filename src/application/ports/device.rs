//! Audio input device port interfaces

use std::time::Duration;

use thiserror::Error;

use crate::domain::recording::{AudioFormat, RawFrame};

/// Device errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Audio input device not found: \"{requested}\". {available}")]
    NotFound { requested: String, available: String },

    #[error("No audio input device available")]
    NoDefaultDevice,

    #[error("Audio input device is already in use: {0}")]
    Busy(String),

    #[error("Device \"{device}\" does not support {channels} channel(s) at {sample_rate} Hz")]
    UnsupportedConfig {
        device: String,
        channels: u16,
        sample_rate: u32,
    },

    #[error("Audio backend error: {0}")]
    Backend(String),

    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
}

/// Parameters for opening a capture handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// Device name; `None` selects the system default input
    pub device: Option<String>,
    /// Channel count and sample rate the device must deliver
    pub format: AudioFormat,
    /// Samples per channel in each delivered frame
    pub frame_samples: usize,
}

impl OpenRequest {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            device: None,
            format,
            frame_samples: DEFAULT_FRAME_SAMPLES,
        }
    }

    /// Bytes in one full frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_samples * self.format.block_align() as usize
    }

    /// Name used in log and error messages
    pub fn device_label(&self) -> &str {
        self.device.as_deref().unwrap_or("default")
    }
}

/// Samples per channel delivered in one frame by default
pub const DEFAULT_FRAME_SAMPLES: usize = 1024;

/// Port for an audio input device.
///
/// Opening happens on the capture worker, so the returned handle does not
/// need to be `Send`; the source itself is shared across threads.
pub trait DeviceSource: Send + Sync {
    /// Open the device for the requested format.
    ///
    /// Fails when the device does not exist, is in use, or cannot deliver
    /// the requested channel count and sample rate.
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn DeviceHandle>, DeviceError>;
}

/// An open capture stream.
pub trait DeviceHandle {
    /// Next frame in capture order, or `None` if nothing arrived within
    /// `timeout`. Never returns a frame twice.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, DeviceError>;

    /// Stop producing new audio. Frames already captured, including a
    /// trailing partial frame, stay readable through `read_frame`.
    fn halt(&mut self) {}

    /// Release the device. Idempotent.
    fn close(&mut self);
}
