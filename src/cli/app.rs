//! Record command runner

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use crate::application::ports::{ConfigStore, DeviceSource};
use crate::application::{
    PreparedRecording, RecorderService, RecordingRequest, SessionOptions, SessionRegistry,
};
use crate::domain::config::AppConfig;
use crate::domain::recording::{Channels, Codec, Duration, ExistingFileAction};
use crate::infrastructure::{input_device_names, platform_source, ContainerFactory, ScriptedSource};

use super::args::{Cli, RecordOptions};
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How often the spinner refreshes the elapsed time
const PROGRESS_TICK: StdDuration = StdDuration::from_millis(200);

/// Settings given on the command line, as a partial config
pub fn cli_config(cli: &Cli) -> AppConfig {
    AppConfig {
        channels: cli.channels.map(|c| Channels::from(c).as_str().to_string()),
        sample_rate: cli.sample_rate,
        codec: cli.codec.map(|c| Codec::from(c).as_str().to_string()),
        device: cli.device.clone(),
        if_exists: cli
            .if_exists
            .map(|a| ExistingFileAction::from(a).as_str().to_string()),
        poll_interval_ms: None,
        finalize_grace_ms: None,
    }
}

/// Load and merge configuration: defaults < file < cli
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: AppConfig) -> AppConfig {
    let file_config = store.load_or_empty().await;
    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Turn the merged config and remaining flags into record options.
///
/// Errors are usage errors and carry a message for the user.
pub fn resolve_record_options(cli: &Cli, config: &AppConfig) -> Result<RecordOptions, String> {
    let output = cli
        .output
        .clone()
        .ok_or_else(|| "An output path is required (--output)".to_string())?;

    let duration = match cli.duration.as_deref() {
        Some(s) => Some(
            s.parse::<Duration>()
                .map_err(|e| format!("Invalid duration: {}", e))?,
        ),
        None => None,
    };

    let format = config.audio_format();
    if !ContainerFactory::supports(format.codec()) {
        return Err(format!(
            "The {} codec is not available in this build",
            format.codec()
        ));
    }

    let finalize_grace = match cli.grace.as_deref() {
        Some(s) => s
            .parse::<Duration>()
            .map_err(|e| format!("Invalid grace: {}", e))?,
        None => config.finalize_grace_or_default(format.codec()),
    };

    Ok(RecordOptions {
        output,
        format,
        device: config.device_name().map(str::to_string),
        if_exists: config.if_exists_or_default(),
        duration,
        poll_interval: config.poll_interval_or_default(),
        finalize_grace,
        dry_run: cli.dry_run,
        disabled: cli.disabled,
        json: cli.json,
    })
}

fn device_source(options: &RecordOptions) -> Arc<dyn DeviceSource> {
    if options.dry_run {
        let source = ScriptedSource::silence();
        let source = match options.device.as_deref() {
            Some(name) => source.named(name),
            None => source,
        };
        Arc::new(source)
    } else {
        platform_source()
    }
}

fn build_service(options: &RecordOptions) -> Result<RecorderService, String> {
    let base_dir =
        env::current_dir().map_err(|e| format!("Cannot resolve current directory: {}", e))?;

    let session_options = SessionOptions {
        poll_interval: options.poll_interval.as_std(),
        finalize_grace: Some(options.finalize_grace.as_std()),
        device: options.device.clone(),
        ..SessionOptions::default()
    };

    Ok(RecorderService::new(
        device_source(options),
        Arc::new(ContainerFactory::new()),
        Arc::new(SessionRegistry::new()),
        session_options,
        base_dir,
    ))
}

/// Record until the duration elapses or the user interrupts
pub async fn run_record(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let service = match build_service(&options) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let request = RecordingRequest {
        device: options.device.clone(),
        if_exists: options.if_exists,
        enabled: !options.disabled,
        ..RecordingRequest::new(&options.output, options.format)
    };

    let prepared = match service.prepare(request) {
        Ok(prepared) => prepared,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if prepared.is_disabled() {
        presenter.info("Recording disabled; nothing was captured");
        return ExitCode::from(EXIT_SUCCESS);
    }

    if options.dry_run {
        presenter.info("Dry run: recording generated silence");
    }

    // Opening a device can block; keep it off the async workers
    let run_service = Arc::clone(&service);
    let run_prepared = prepared.clone();
    match tokio::task::spawn_blocking(move || run_service.run(&run_prepared)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            presenter.error(&e.to_string());
            if e.is_retryable_start() {
                presenter.info("Check the device name with `trial-recorder devices`");
            }
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&format!("Recorder task failed: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    }

    if let Some(path) = prepared.path() {
        presenter.start_spinner(&format!("Recording to {}", path.display()));
    }
    wait_for_stop(&presenter, &prepared, &shutdown, options.duration).await;
    presenter.update_spinner("Finalizing...");

    let stop_service = Arc::clone(&service);
    let stopped = tokio::task::spawn_blocking(move || stop_service.stop()).await;

    let result = match stopped {
        Ok(Ok(())) => {
            presenter.spinner_success("Recording saved");
            EXIT_SUCCESS
        }
        Ok(Err(e)) => {
            presenter.spinner_fail(&e.to_string());
            EXIT_ERROR
        }
        Err(e) => {
            presenter.spinner_fail(&format!("Recorder task failed: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(summary) = prepared.summary() {
        if options.json {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => presenter.output(&json),
                Err(e) => presenter.error(&format!("Failed to serialize summary: {}", e)),
            }
        } else {
            presenter.summary(&summary);
        }
    }

    ExitCode::from(result)
}

async fn wait_for_stop(
    presenter: &Presenter,
    prepared: &PreparedRecording,
    shutdown: &ShutdownSignal,
    duration: Option<Duration>,
) {
    let started = Instant::now();
    let limit_ms = duration.map(|d| d.as_millis());

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d.as_std()).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::debug!("Recording duration reached");
                break;
            }
            _ = shutdown.wait() => {
                tracing::debug!("Stop requested");
                break;
            }
            _ = ticker.tick() => {
                if !prepared.is_recording() {
                    break;
                }
                let elapsed = started.elapsed().as_millis() as u64;
                presenter.update_recording_progress(elapsed, limit_ms);
            }
        }
    }
}

/// Print the platform's input devices
pub fn list_devices(presenter: &Presenter) -> ExitCode {
    match input_device_names() {
        Ok(names) if names.is_empty() => {
            presenter.warn("No audio input devices found");
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(names) => {
            for name in names {
                presenter.output(&name);
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}
