//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 1m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when an audio format parameter is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid channel setting: \"{0}\". Valid values are: mono, stereo, 1, 2")]
    Channels(String),

    #[error("Invalid sample rate: \"{0}\". Expected 1 to 384000 Hz")]
    SampleRate(String),

    #[error("Invalid codec: \"{0}\". Valid codecs are: wav, opus, flac")]
    Codec(String),

    #[error("Invalid existing-file action: \"{0}\". Valid actions are: overwrite, suffix")]
    ExistingFileAction(String),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
