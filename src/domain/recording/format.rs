//! Audio format value objects
//!
//! Samples are always interleaved signed 16-bit little-endian PCM on the
//! capture side; the codec decides what lands in the output file.

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use serde::Serialize;

use crate::domain::error::FormatError;

/// Bit depth of every captured sample
pub const SAMPLE_WIDTH_BITS: u16 = 16;

/// Bytes per captured sample
pub const BYTES_PER_SAMPLE: usize = (SAMPLE_WIDTH_BITS / 8) as usize;

/// Sample rates offered to experiment designers
pub const STANDARD_SAMPLE_RATES: &[u32] = &[44100, 22050, 11025];

/// Default sample rate (CD quality)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Highest rate a session accepts
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Grace period applied before finalizing compressed containers
pub const DEFAULT_COMPRESSED_GRACE: StdDuration = StdDuration::from_millis(1000);

/// Channel layout of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

impl Channels {
    /// Number of interleaved channels
    pub const fn count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /// Get the string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::Stereo => "stereo",
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Channels {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mono" | "1" => Ok(Self::Mono),
            "stereo" | "2" => Ok(Self::Stereo),
            _ => Err(FormatError::Channels(s.to_string())),
        }
    }
}

impl TryFrom<u16> for Channels {
    type Error = FormatError;

    fn try_from(count: u16) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(FormatError::Channels(other.to_string())),
        }
    }
}

/// Output container families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// RIFF/WAVE with a PCM payload
    Wav,
    /// Ogg pages carrying Opus packets
    Ogg,
    /// Native FLAC stream
    Flac,
}

impl Container {
    /// Whether the payload is compressed
    pub const fn is_compressed(&self) -> bool {
        !matches!(self, Self::Wav)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested codec for the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Uncompressed PCM in a WAV container
    #[default]
    Wav,
    /// Lossy Opus in an Ogg container
    Opus,
    /// Lossless FLAC
    Flac,
}

impl Codec {
    /// Container the codec is written into
    pub const fn container(&self) -> Container {
        match self {
            Self::Wav => Container::Wav,
            Self::Opus => Container::Ogg,
            Self::Flac => Container::Flac,
        }
    }

    /// File extension expected for this codec
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Opus => "opus",
            Self::Flac => "flac",
        }
    }

    /// Whether the codec discards information
    pub const fn is_lossy(&self) -> bool {
        matches!(self, Self::Opus)
    }

    /// Time to keep draining in-flight frames after stop is requested.
    ///
    /// Compressed encoders lose their tail if the device is torn down the
    /// moment the stop flag is raised.
    pub const fn default_finalize_grace(&self) -> StdDuration {
        if self.container().is_compressed() {
            DEFAULT_COMPRESSED_GRACE
        } else {
            StdDuration::ZERO
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Opus => "opus",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Codec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "none" | "pcm" => Ok(Self::Wav),
            "opus" | "ogg" => Ok(Self::Opus),
            "flac" => Ok(Self::Flac),
            _ => Err(FormatError::Codec(s.to_string())),
        }
    }
}

/// Format of a recording session.
/// Fixed for the lifetime of a session; a new format needs a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AudioFormat {
    channels: Channels,
    sample_rate: u32,
    codec: Codec,
}

impl AudioFormat {
    /// Create a validated format
    pub fn new(channels: Channels, sample_rate: u32, codec: Codec) -> Result<Self, FormatError> {
        if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
            return Err(FormatError::SampleRate(sample_rate.to_string()));
        }
        Ok(Self {
            channels,
            sample_rate,
            codec,
        })
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn container(&self) -> Container {
        self.codec.container()
    }

    pub fn sample_width_bits(&self) -> u16 {
        SAMPLE_WIDTH_BITS
    }

    /// Bytes per interleaved sample frame (one sample for every channel)
    pub fn block_align(&self) -> u16 {
        self.channel_count() * SAMPLE_WIDTH_BITS / 8
    }

    /// PCM bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Playback duration of a PCM payload of `bytes` length
    pub fn duration_of(&self, bytes: u64) -> StdDuration {
        let byte_rate = self.byte_rate() as u64;
        if byte_rate == 0 {
            return StdDuration::ZERO;
        }
        StdDuration::from_millis(bytes * 1000 / byte_rate)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: Channels::Mono,
            sample_rate: DEFAULT_SAMPLE_RATE,
            codec: Codec::Wav,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz {} {}-bit {}",
            self.sample_rate, self.channels, SAMPLE_WIDTH_BITS, self.codec
        )
    }
}

/// Parse a sample rate string such as "44100"
pub fn parse_sample_rate(s: &str) -> Result<u32, FormatError> {
    match s.trim().parse::<u32>() {
        Ok(rate) if rate > 0 && rate <= MAX_SAMPLE_RATE => Ok(rate),
        _ => Err(FormatError::SampleRate(s.to_string())),
    }
}
