//! Clap derive structures for the `plugline` CLI.
//!
//! Kept free of workspace dependencies so `build.rs` can include it to
//! render the man page.

use std::path::PathBuf;

use clap::Parser;

/// plugline -- smart plug readings as InfluxDB line protocol
#[derive(Debug, Parser)]
#[command(
    name = "plugline",
    version,
    about = "Poll TP-Link energy-monitoring smart plugs and print InfluxDB line protocol",
    long_about = "Polls every enabled plug in the configuration concurrently and prints one\n\
        InfluxDB line protocol record per plug on stdout, suitable for a Telegraf\n\
        exec input.\n\n\
        Logs go to stderr. Set RUST_LOG to override the log filter."
)]
pub struct Cli {
    /// Configuration file (.json or .toml)
    #[arg(long, short = 'c', env = "PLUGLINE_CONFIG", conflicts_with = "address")]
    pub config: Option<PathBuf>,

    /// Poll a single plug at this address (host or host:port) instead of reading a config file
    #[arg(long, short = 'a', env = "PLUGLINE_ADDRESS")]
    pub address: Option<String>,

    /// Measurement name for --address (defaults to the plug's host)
    #[arg(long, short = 'm', requires = "address")]
    pub measurement: Option<String>,

    /// Stop at the first failing plug and print nothing
    #[arg(long, short = 's')]
    pub stop_on_error: bool,

    /// Log progress to stderr
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log debug detail to stderr
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Poll timeout in seconds, for plugs without their own timeout
    #[arg(long, short = 't', env = "PLUGLINE_TIMEOUT", default_value = "1", value_parser = parse_timeout)]
    pub timeout: f64,

    /// Omit the polltime fields and the polltime_total line
    #[arg(long)]
    pub no_poll_time: bool,
}

fn parse_timeout(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.trim().parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("timeout must be a positive number of seconds, got {secs}"))
    }
}

impl Cli {
    /// 0 = warnings only, 1 = info, 2 = debug.
    pub fn verbosity(&self) -> u8 {
        if self.debug {
            2
        } else {
            u8::from(self.verbose)
        }
    }
}
