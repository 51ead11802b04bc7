//! Configuration loading for plugline.
//!
//! JSON or TOML documents mapping measurement -> plug -> settings, parsed
//! straight into `plugline_core::MeasurementsConfig` and validated before any
//! plug is contacted. Every map keeps document order, which fixes the order of
//! measurements, tags, fields and calculated fields in the output.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::debug;

use plugline_core::{MeasurementsConfig, PlugConfig, PlugSetup};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported config format for {}, expected .json or .toml", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

impl ConfigError {
    /// `true` for a missing file, as opposed to a file with bad contents.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "plugline").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.json");
            p
        },
        |dirs| dirs.config_dir().join("config.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("plugline");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config file at `path`.
///
/// The format follows the extension: `.toml` is TOML, `.json` (or no
/// extension) is JSON.
pub fn load_config(path: &Path) -> Result<MeasurementsConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let format = match extension.as_deref() {
        Some("json") | None => Format::Json,
        Some("toml") => Format::Toml,
        Some(_) => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&contents, format, path)?;
    validate(&config)?;
    debug!(
        path = %path.display(),
        measurements = config.measurements.len(),
        plugs = config.plug_count(),
        "loaded config"
    );
    Ok(config)
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Toml,
}

fn parse(contents: &str, format: Format, path: &Path) -> Result<MeasurementsConfig, ConfigError> {
    match format {
        Format::Json => serde_json::from_str(contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Format::Toml => toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source: Box::new(source),
        }),
    }
}

/// Check names, addresses, timeouts and calculated field definitions.
pub fn validate(config: &MeasurementsConfig) -> Result<(), ConfigError> {
    for (measurement, plugs) in config.iter() {
        if measurement.trim().is_empty() {
            return Err(invalid("measurement", "name must not be empty"));
        }
        for (plug, settings) in plugs {
            if plug.trim().is_empty() {
                return Err(invalid(
                    format!("{measurement} plug"),
                    "name must not be empty",
                ));
            }
            validate_plug(measurement, plug, settings)?;
        }
    }
    Ok(())
}

fn validate_plug(measurement: &str, plug: &str, settings: &PlugConfig) -> Result<(), ConfigError> {
    let field = |name: &str| format!("{measurement}.{plug}.{name}");

    if settings.enabled && settings.address.trim().is_empty() {
        return Err(invalid(field("address"), "enabled plugs need an address"));
    }
    if let Some(timeout) = settings.timeout {
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(invalid(
                field("timeout"),
                format!("expected a positive number of seconds, got {timeout}"),
            ));
        }
    }
    // Disabled plugs are never polled, so their calculated fields are never built.
    if settings.enabled {
        PlugSetup::from_config(settings)
            .map_err(|err| invalid(field(&format!("calculated_fields.{}", err.field())), err.to_string()))?;
    }
    Ok(())
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Config for a single plug given on the command line.
pub fn single_plug_config(measurement: &str, plug: &str, address: &str) -> MeasurementsConfig {
    let mut config = MeasurementsConfig::new();
    config.insert(measurement, plug, PlugConfig::with_address(address));
    config
}
