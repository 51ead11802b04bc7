//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use plugline_config::ConfigError;
use plugline_core::RunError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const NO_CONFIG: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(plugline::no_config),
        help(
            "Create a config file, pass one with --config (-c),\n\
             or poll a single plug with --address (-a)."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(plugline::config), help("Fix the configuration file and try again."))]
    Config(ConfigError),

    // ── Polling ──────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(plugline::plug_failed),
        help("Run without --stop-on-error (-s) to skip failing plugs, or with -d for detail.")
    )]
    PlugFailed(#[from] RunError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error("Failed to write output: {0}")]
    #[diagnostic(code(plugline::io))]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } => exit_code::NO_CONFIG,
            Self::Config(_) => exit_code::CONFIG,
            Self::PlugFailed(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
