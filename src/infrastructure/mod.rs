//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with audio hardware, codecs and the filesystem.

pub mod config;
pub mod device;
pub mod recording;

// Re-export adapters
pub use config::XdgConfigStore;
#[cfg(feature = "cpal")]
pub use device::CpalSource;
pub use device::{input_device_names, platform_source, ScriptedSource};
pub use recording::{ContainerFactory, FlacEncoder, FlacWriter, WavWriter};
