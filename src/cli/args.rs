//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::recording::{
    parse_sample_rate, AudioFormat, Channels, Codec, Duration, ExistingFileAction,
    STANDARD_SAMPLE_RATES,
};

/// Trial Recorder - capture one input device to WAV, FLAC or Ogg/Opus
#[derive(Parser, Debug)]
#[command(name = "trial-recorder")]
#[command(version)]
#[command(about = "Record audio from an input device to WAV, FLAC or Ogg/Opus")]
#[command(long_about = None)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    /// Output file; the codec extension is appended when missing
    #[arg(short = 'o', long, value_name = "PATH", required = true)]
    pub output: Option<PathBuf>,

    /// Channel layout
    #[arg(short = 'c', long, value_name = "LAYOUT")]
    pub channels: Option<ChannelsArg>,

    /// Sample rate in Hz (44100, 22050, 11025)
    #[arg(short = 'r', long, value_name = "HZ", value_parser = parse_standard_rate)]
    pub sample_rate: Option<u32>,

    /// Output codec
    #[arg(short = 'f', long = "format", value_name = "CODEC")]
    pub codec: Option<CodecArg>,

    /// Input device name ("default" selects the system default)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Stop after this long (e.g., 10s, 1m, 2m30s); otherwise record until Ctrl+C
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// What to do when the output file already exists
    #[arg(long, value_name = "ACTION")]
    pub if_exists: Option<IfExistsArg>,

    /// Keep reading this long after stop before finalizing (e.g., 500ms)
    #[arg(long, value_name = "TIME")]
    pub grace: Option<String>,

    /// Record generated silence instead of a real device
    #[arg(long)]
    pub dry_run: bool,

    /// Prepare a recorder that does nothing
    #[arg(long, conflicts_with = "dry_run")]
    pub disabled: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List audio input devices
    Devices,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChannelsArg {
    Mono,
    Stereo,
}

impl From<ChannelsArg> for Channels {
    fn from(arg: ChannelsArg) -> Self {
        match arg {
            ChannelsArg::Mono => Channels::Mono,
            ChannelsArg::Stereo => Channels::Stereo,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    Wav,
    Opus,
    Flac,
}

impl From<CodecArg> for Codec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Wav => Codec::Wav,
            CodecArg::Opus => Codec::Opus,
            CodecArg::Flac => Codec::Flac,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum IfExistsArg {
    Overwrite,
    Suffix,
}

impl From<IfExistsArg> for ExistingFileAction {
    fn from(arg: IfExistsArg) -> Self {
        match arg {
            IfExistsArg::Overwrite => ExistingFileAction::Overwrite,
            IfExistsArg::Suffix => ExistingFileAction::AppendSuffix,
        }
    }
}

/// Parsed record options
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub output: PathBuf,
    pub format: AudioFormat,
    pub device: Option<String>,
    pub if_exists: ExistingFileAction,
    /// `None` records until interrupted
    pub duration: Option<Duration>,
    pub poll_interval: Duration,
    pub finalize_grace: Duration,
    pub dry_run: bool,
    pub disabled: bool,
    pub json: bool,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "channels",
    "sample_rate",
    "codec",
    "device",
    "if_exists",
    "poll_interval_ms",
    "finalize_grace_ms",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

/// Accept only the rates the recorder is qualified for
pub fn parse_standard_rate(s: &str) -> Result<u32, String> {
    let rate = parse_sample_rate(s).map_err(|e| e.to_string())?;
    if STANDARD_SAMPLE_RATES.contains(&rate) {
        Ok(rate)
    } else {
        let valid: Vec<String> = STANDARD_SAMPLE_RATES.iter().map(u32::to_string).collect();
        Err(format!(
            "Unsupported sample rate {}. Valid rates: {}",
            rate,
            valid.join(", ")
        ))
    }
}
