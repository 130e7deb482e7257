//! Audio input device adapters

#[cfg(feature = "cpal")]
mod cpal_source;
mod scripted;

use std::sync::Arc;

use crate::application::ports::{DeviceError, DeviceSource};
#[cfg(not(feature = "cpal"))]
use crate::application::ports::{DeviceHandle, OpenRequest};

#[cfg(feature = "cpal")]
pub use cpal_source::CpalSource;
pub use scripted::ScriptedSource;

/// Platform input source for this build
#[cfg(feature = "cpal")]
pub fn platform_source() -> Arc<dyn DeviceSource> {
    Arc::new(CpalSource::new())
}

/// Platform input source for this build
#[cfg(not(feature = "cpal"))]
pub fn platform_source() -> Arc<dyn DeviceSource> {
    Arc::new(UnavailableSource)
}

/// Names of the input devices the platform backend can open
#[cfg(feature = "cpal")]
pub fn input_device_names() -> Result<Vec<String>, DeviceError> {
    CpalSource::device_names()
}

/// Names of the input devices the platform backend can open
#[cfg(not(feature = "cpal"))]
pub fn input_device_names() -> Result<Vec<String>, DeviceError> {
    Err(DeviceError::Backend(
        "built without platform audio support".to_string(),
    ))
}

/// Stand-in when the crate is built without platform capture
#[cfg(not(feature = "cpal"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSource;

#[cfg(not(feature = "cpal"))]
impl DeviceSource for UnavailableSource {
    fn open(&self, _request: &OpenRequest) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        Err(DeviceError::Backend(
            "built without platform audio support; use --dry-run".to_string(),
        ))
    }
}

/// Human-readable device list for error messages
pub(crate) fn describe_available(names: &[String]) -> String {
    if names.is_empty() {
        "No audio input devices found.".to_string()
    } else {
        format!(
            "Available devices:\n{}",
            names
                .iter()
                .map(|n| format!("  - {}", n))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_devices() {
        let names = vec!["USB Microphone".to_string(), "Webcam".to_string()];
        let text = describe_available(&names);
        assert!(text.starts_with("Available devices:"));
        assert!(text.contains("  - USB Microphone"));
        assert_eq!(describe_available(&[]), "No audio input devices found.");
    }
}
