//! Recorder error type

use thiserror::Error;

use crate::application::ports::{DeviceError, EncodeError, WriteError};
use crate::domain::recording::InvalidStateTransition;

/// Errors surfaced by sessions, the registry and the recorder service
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    IllegalState(#[from] InvalidStateTransition),

    #[error("Sound recorder already running. Only one recording can be active at a time")]
    Concurrency,

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No sound being recorded. Unable to stop recording")]
    NoActiveSession,

    #[error("Capture worker failed: {0}")]
    Worker(String),
}

impl From<EncodeError> for RecorderError {
    fn from(e: EncodeError) -> Self {
        Self::Write(WriteError::Encode(e))
    }
}

impl RecorderError {
    /// Whether the error leaves the session usable for another `start`
    pub fn is_retryable_start(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}
