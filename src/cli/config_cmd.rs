//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, MAX_POLL_INTERVAL_MS};
use crate::domain::error::ConfigError;
use crate::domain::recording::{Channels, Codec, ExistingFileAction};

use super::args::{is_valid_config_key, parse_standard_rate, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config).await?;

    let stored = config_value(&config, key).unwrap_or_else(|| value.to_string());
    presenter.success(&format!("{} = {}", key, stored));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match config_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        let value = config_value(&config, key);
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Validate `value` for `key` and store it in canonical form
fn apply_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "channels" => {
            let channels: Channels = value.parse().map_err(|e| invalid(key, format!("{}", e)))?;
            config.channels = Some(channels.as_str().to_string());
        }
        "sample_rate" => {
            config.sample_rate = Some(parse_standard_rate(value).map_err(|e| invalid(key, e))?);
        }
        "codec" => {
            let codec: Codec = value.parse().map_err(|e| invalid(key, format!("{}", e)))?;
            config.codec = Some(codec.as_str().to_string());
        }
        "device" => {
            let name = value.trim();
            config.device = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
        }
        "if_exists" => {
            let action: ExistingFileAction =
                value.parse().map_err(|e| invalid(key, format!("{}", e)))?;
            config.if_exists = Some(action.as_str().to_string());
        }
        "poll_interval_ms" => {
            let ms = parse_millis(key, value)?;
            if ms == 0 || ms > MAX_POLL_INTERVAL_MS {
                return Err(invalid(
                    key,
                    format!("Value must be between 1 and {}", MAX_POLL_INTERVAL_MS),
                ));
            }
            config.poll_interval_ms = Some(ms);
        }
        "finalize_grace_ms" => {
            config.finalize_grace_ms = Some(parse_millis(key, value)?);
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn parse_millis(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(key, "Value must be a whole number of milliseconds"))
}

/// Stored value for `key`, formatted for display
fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "channels" => config.channels.clone(),
        "sample_rate" => config.sample_rate.map(|r| r.to_string()),
        "codec" => config.codec.clone(),
        "device" => config.device.clone(),
        "if_exists" => config.if_exists.clone(),
        "poll_interval_ms" => config.poll_interval_ms.map(|ms| ms.to_string()),
        "finalize_grace_ms" => config.finalize_grace_ms.map(|ms| ms.to_string()),
        _ => None,
    }
}
