// ── Run orchestration ──
//
// Measurements are processed one after another. Inside a measurement every
// enabled plug gets its own task owning its `PollCache`; all tasks are joined
// before the next measurement starts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};

use crate::cache::PollCache;
use crate::clock::elapsed_millis;
use crate::config::{MeasurementsConfig, PlugConfig};
use crate::device::Device;
use crate::error::{PlugError, RunError};
use crate::line::MetricLine;
use crate::metric::{MetricAssembler, PlugSetup};

/// Run-wide knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Abort on the first failing plug instead of skipping it.
    pub stop_on_error: bool,
    /// Append a `polltime` field to every line.
    pub poll_time: bool,
    /// Poll timeout for plugs that don't set their own.
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            poll_time: true,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A plug that was skipped.
#[derive(Debug)]
pub struct PlugFailure {
    pub measurement: String,
    pub plug: String,
    pub error: PlugError,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Rendered lines, sorted.
    pub lines: Vec<String>,
    pub failures: Vec<PlugFailure>,
    /// Wall time of the whole run in milliseconds.
    pub total_millis: i64,
}

impl RunReport {
    fn record_failure(
        &mut self,
        stop_on_error: bool,
        measurement: &str,
        plug: &str,
        error: PlugError,
    ) -> Result<(), RunError> {
        if stop_on_error {
            return Err(RunError::PlugFailed {
                measurement: measurement.to_owned(),
                plug: plug.to_owned(),
                source: error,
            });
        }
        warn!(measurement, plug, error = %error, "skipping plug");
        self.failures.push(PlugFailure {
            measurement: measurement.to_owned(),
            plug: plug.to_owned(),
            error,
        });
        Ok(())
    }
}

/// Poll every enabled plug and collect one line per plug.
///
/// `connect` builds the device for a plug; it is only called for enabled
/// plugs. With `stop_on_error` the first failure drops the remaining tasks
/// and is returned as the error.
pub async fn run<D, F>(config: &MeasurementsConfig, options: &RunOptions, connect: F) -> Result<RunReport, RunError>
where
    D: Device + 'static,
    F: Fn(&str, &PlugConfig) -> D,
{
    let started = Instant::now();
    let mut report = RunReport::default();

    for (measurement, plugs) in config.iter() {
        let mut tasks = JoinSet::new();
        let mut names: HashMap<Id, String> = HashMap::new();

        for (plug, plug_config) in plugs {
            if !plug_config.enabled {
                debug!(measurement, plug = %plug, "plug disabled");
                continue;
            }

            let setup = match PlugSetup::from_config(plug_config) {
                Ok(setup) => setup,
                Err(source) => {
                    let error = PlugError::CalculatedFields {
                        plug: plug.clone(),
                        source,
                    };
                    report.record_failure(options.stop_on_error, measurement, plug, error)?;
                    continue;
                }
            };

            let cache = PollCache::new(
                plug.as_str(),
                plug_config.address.as_str(),
                connect(plug.as_str(), plug_config),
                plug_timeout(plug_config, options.timeout),
            );
            let assembler = MetricAssembler::new(measurement, setup);
            let handle = tasks.spawn(plug_task(assembler, cache, options.poll_time));
            names.insert(handle.id(), plug.clone());
        }

        info!(measurement, plugs = tasks.len(), "polling measurement");

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(err) => {
                    let id = err.id();
                    let plug = names.get(&id).cloned().unwrap_or_default();
                    let message = err.to_string();
                    (id, Err(PlugError::Worker { plug, message }))
                }
            };
            let plug = names.remove(&id).unwrap_or_default();

            match outcome {
                Ok(line) => report.lines.push(line.to_string()),
                Err(error) => report.record_failure(options.stop_on_error, measurement, &plug, error)?,
            }
        }
    }

    report.lines.sort();
    report.total_millis = elapsed_millis(started, Instant::now());
    info!(
        lines = report.lines.len(),
        failures = report.failures.len(),
        total_ms = report.total_millis,
        "run complete"
    );
    Ok(report)
}

async fn plug_task<D: Device>(
    assembler: MetricAssembler,
    mut cache: PollCache<D>,
    poll_time: bool,
) -> Result<MetricLine, PlugError> {
    let started = Instant::now();
    let line = assembler.poll(&mut cache).await?;
    if poll_time {
        return Ok(line.with_field("polltime", elapsed_millis(started, Instant::now())));
    }
    Ok(line)
}

fn plug_timeout(config: &PlugConfig, fallback: Duration) -> Duration {
    config
        .timeout
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(fallback)
}
