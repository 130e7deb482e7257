//! Streaming encoder port interface

use thiserror::Error;

use crate::domain::recording::{EncodedChunk, RawFrame};

/// Encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Encoder configuration rejected: {0}")]
    Config(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Port for a stateful PCM-to-codec transcoder.
///
/// Frames must arrive in capture order. `finish` consumes the encoder so it
/// runs exactly once, after the last `encode`.
pub trait Encoder: Send {
    /// Feed one frame; returns the chunks that became ready (possibly none)
    fn encode(&mut self, frame: RawFrame) -> Result<Vec<EncodedChunk>, EncodeError>;

    /// Flush buffered audio and emit the codec trailer
    fn finish(self: Box<Self>) -> Result<Vec<EncodedChunk>, EncodeError>;
}
