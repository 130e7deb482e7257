//! Trial Recorder CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trial_recorder::cli::{
    app::{cli_config, list_devices, load_merged_config, resolve_record_options, run_record},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
    EXIT_ERROR, EXIT_USAGE_ERROR,
};
use trial_recorder::infrastructure::XdgConfigStore;

/// Log filter variable checked before `RUST_LOG`
const LOG_ENV: &str = "TRIAL_RECORDER_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trial_recorder=debug,warn")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();
    let store = XdgConfigStore::from_env();

    // Handle subcommands
    match cli.command.take() {
        Some(Commands::Config { action }) => {
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Devices) => return list_devices(&presenter),
        None => {}
    }

    let config = load_merged_config(&store, cli_config(&cli)).await;

    let options = match resolve_record_options(&cli, &config) {
        Ok(options) => options,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    run_record(options).await
}
