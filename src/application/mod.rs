//! Application layer - Use cases and port interfaces
//!
//! Contains the recording engine and the trait definitions
//! for devices, encoders, containers and configuration storage.

pub mod error;
pub mod frame_buffer;
pub mod pipeline;
pub mod ports;
pub mod recorder;
pub mod registry;
pub mod session;

pub use error::RecorderError;
pub use frame_buffer::FrameBuffer;
pub use pipeline::Pipeline;
pub use recorder::{PreparedRecording, RecorderService, RecordingRequest};
pub use registry::SessionRegistry;
pub use session::{RecordingSession, RecordingSummary, SessionOptions};
