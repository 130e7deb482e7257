//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the recording engine
//! and the devices, codecs and files it drives.

pub mod config;
pub mod device;
pub mod encoder;
pub mod pipeline;
pub mod writer;

// Re-export common types
pub use config::ConfigStore;
pub use device::{DeviceError, DeviceHandle, DeviceSource, OpenRequest, DEFAULT_FRAME_SAMPLES};
pub use encoder::{EncodeError, Encoder};
pub use pipeline::PipelineFactory;
pub use writer::{ContainerWriter, WriteError};
