//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::{
    AudioFormat, Channels, Codec, Duration, ExistingFileAction, DEFAULT_SAMPLE_RATE,
};

/// Default capture poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30;

/// Upper bound on the poll interval; stop must be observed quickly
pub const MAX_POLL_INTERVAL_MS: u64 = 50;

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub channels: Option<String>,
    pub sample_rate: Option<u32>,
    pub codec: Option<String>,
    pub device: Option<String>,
    pub if_exists: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub finalize_grace_ms: Option<u64>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            channels: Some("mono".to_string()),
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            codec: Some("wav".to_string()),
            device: None,
            if_exists: Some("overwrite".to_string()),
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
            finalize_grace_ms: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            channels: other.channels.or(self.channels),
            sample_rate: other.sample_rate.or(self.sample_rate),
            codec: other.codec.or(self.codec),
            device: other.device.or(self.device),
            if_exists: other.if_exists.or(self.if_exists),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            finalize_grace_ms: other.finalize_grace_ms.or(self.finalize_grace_ms),
        }
    }

    /// Get channels, or mono if not set/invalid
    pub fn channels_or_default(&self) -> Channels {
        self.channels
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get sample rate, or 44100 if not set/zero
    pub fn sample_rate_or_default(&self) -> u32 {
        self.sample_rate
            .filter(|rate| *rate > 0)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Get codec, or wav if not set/invalid
    pub fn codec_or_default(&self) -> Codec {
        self.codec
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get the existing-file policy, or overwrite if not set/invalid
    pub fn if_exists_or_default(&self) -> ExistingFileAction {
        self.if_exists
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Device name; `None` and "default" both select the system default
    pub fn device_name(&self) -> Option<&str> {
        self.device
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("default"))
    }

    /// Poll interval, clamped to 1..=50ms
    pub fn poll_interval_or_default(&self) -> Duration {
        let ms = self
            .poll_interval_ms
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
            .clamp(1, MAX_POLL_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    /// Grace period before finalizing; falls back to the codec default
    pub fn finalize_grace_or_default(&self, codec: Codec) -> Duration {
        self.finalize_grace_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| codec.default_finalize_grace().into())
    }

    /// Build the audio format described by this config
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(
            self.channels_or_default(),
            self.sample_rate_or_default(),
            self.codec_or_default(),
        )
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.channels, Some("mono".to_string()));
        assert_eq!(config.sample_rate, Some(44100));
        assert_eq!(config.codec, Some("wav".to_string()));
        assert!(config.device.is_none());
        assert_eq!(config.if_exists, Some("overwrite".to_string()));
        assert_eq!(config.poll_interval_ms, Some(30));
        assert!(config.finalize_grace_ms.is_none());
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.channels.is_none());
        assert!(config.sample_rate.is_none());
        assert!(config.codec.is_none());
        assert!(config.poll_interval_ms.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            channels: Some("mono".to_string()),
            sample_rate: Some(44100),
            codec: Some("wav".to_string()),
            ..Default::default()
        };

        let other = AppConfig {
            channels: Some("stereo".to_string()),
            sample_rate: None,
            codec: Some("flac".to_string()),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.channels, Some("stereo".to_string()));
        assert_eq!(merged.sample_rate, Some(44100));
        assert_eq!(merged.codec, Some("flac".to_string()));
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = AppConfig {
            device: Some("USB Mic".to_string()),
            finalize_grace_ms: Some(250),
            ..Default::default()
        };

        let merged = base.merge(AppConfig::empty());

        assert_eq!(merged.device, Some("USB Mic".to_string()));
        assert_eq!(merged.finalize_grace_ms, Some(250));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AppConfig {
            channels: Some("quad".to_string()),
            sample_rate: Some(0),
            codec: Some("mp3".to_string()),
            if_exists: Some("ignore".to_string()),
            ..Default::default()
        };
        assert_eq!(config.channels_or_default(), Channels::Mono);
        assert_eq!(config.sample_rate_or_default(), 44100);
        assert_eq!(config.codec_or_default(), Codec::Wav);
        assert_eq!(config.if_exists_or_default(), ExistingFileAction::Overwrite);
    }

    #[test]
    fn device_name_treats_default_as_none() {
        let config = AppConfig {
            device: Some("Default".to_string()),
            ..Default::default()
        };
        assert!(config.device_name().is_none());

        let config = AppConfig {
            device: Some("Scarlett 2i2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.device_name(), Some("Scarlett 2i2"));
    }

    #[test]
    fn poll_interval_is_clamped() {
        let config = AppConfig {
            poll_interval_ms: Some(500),
            ..Default::default()
        };
        assert_eq!(config.poll_interval_or_default().as_millis(), 50);
        assert_eq!(AppConfig::empty().poll_interval_or_default().as_millis(), 30);
    }

    #[test]
    fn grace_defaults_follow_codec() {
        let config = AppConfig::empty();
        assert!(config.finalize_grace_or_default(Codec::Wav).is_zero());
        assert_eq!(config.finalize_grace_or_default(Codec::Opus).as_millis(), 1000);

        let config = AppConfig {
            finalize_grace_ms: Some(200),
            ..Default::default()
        };
        assert_eq!(config.finalize_grace_or_default(Codec::Opus).as_millis(), 200);
    }

    #[test]
    fn audio_format_from_config() {
        let config = AppConfig {
            channels: Some("stereo".to_string()),
            sample_rate: Some(22050),
            codec: Some("flac".to_string()),
            ..Default::default()
        };
        let format = config.audio_format();
        assert_eq!(format.channels(), Channels::Stereo);
        assert_eq!(format.sample_rate(), 22050);
        assert_eq!(format.codec(), Codec::Flac);
    }
}
