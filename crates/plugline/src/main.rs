mod cli;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use plugline_api::SmartPlug;
use plugline_core::{MeasurementsConfig, PlugConfig, RunOptions};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbosity());

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr; stdout carries only line protocol.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let options = RunOptions {
        stop_on_error: cli.stop_on_error,
        poll_time: !cli.no_poll_time,
        timeout: Duration::try_from_secs_f64(cli.timeout).unwrap_or(Duration::MAX),
    };

    tracing::debug!(
        measurements = config.measurements.len(),
        plugs = config.plug_count(),
        stop_on_error = options.stop_on_error,
        "starting run"
    );
    let report = plugline_core::run(&config, &options, connect).await?;

    output::print_output(&output::render(&report, options.poll_time))?;
    Ok(())
}

/// Single-plug config from `--address`, otherwise the config file.
fn load_config(cli: &Cli) -> Result<MeasurementsConfig, CliError> {
    if let Some(address) = cli.address.as_deref() {
        let plug = SmartPlug::new(address);
        let measurement = cli.measurement.as_deref().unwrap_or(plug.host());
        let config = plugline_config::single_plug_config(measurement, plug.host(), address);
        plugline_config::validate(&config)?;
        return Ok(config);
    }

    let path = cli.config.clone().unwrap_or_else(plugline_config::config_path);
    Ok(plugline_config::load_config(&path)?)
}

fn connect(_plug: &str, config: &PlugConfig) -> SmartPlug {
    SmartPlug::new(&config.address)
}
