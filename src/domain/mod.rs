//! Domain layer - Core recording model
//!
//! Contains value objects (formats, frames, targets), the session state
//! machine and domain errors. This layer has no dependencies on devices,
//! codecs or the filesystem.

pub mod config;
pub mod error;
pub mod recording;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use recording::{
    AudioFormat, Channels, Codec, Container, Duration, EncodedChunk, ExistingFileAction,
    OutputTarget, RawFrame, SessionState,
};
