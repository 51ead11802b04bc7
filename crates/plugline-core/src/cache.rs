// ── Per-plug polling cache ──
//
// One `PollCache` per plug, owned by that plug's worker. Both readings are
// refreshed together and only on success; a failed poll leaves the previous
// snapshot and its timestamp untouched so the next call retries.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, trace};

use crate::clock::{Clock, MonotonicClock, elapsed_millis};
use crate::device::Device;
use crate::error::PollError;
use crate::model::{Reading, ReadingKind, reading_from_object};

/// How long a successful poll is reused before the plug is asked again.
pub const POLL_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct Snapshot {
    sysinfo: Reading,
    energy: Reading,
    polled_at: Instant,
}

/// TTL-gated cache in front of one [`Device`].
pub struct PollCache<D, C = MonotonicClock> {
    name: String,
    address: String,
    device: D,
    clock: C,
    snapshot: Option<Snapshot>,
}

impl<D: Device> PollCache<D> {
    pub fn new(name: impl Into<String>, address: impl Into<String>, device: D, timeout: Duration) -> Self {
        Self::with_clock(name, address, device, timeout, MonotonicClock)
    }
}

impl<D: Device, C: Clock> PollCache<D, C> {
    pub fn with_clock(
        name: impl Into<String>,
        address: impl Into<String>,
        mut device: D,
        timeout: Duration,
        clock: C,
    ) -> Self {
        device.set_timeout(timeout);
        let cache = Self {
            name: name.into(),
            address: address.into(),
            device,
            clock,
            snapshot: None,
        };
        debug!(
            plug = %cache.name,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "initialised plug"
        );
        cache
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.device.timeout()
    }

    /// Instant of the last successful poll, if any.
    pub fn last_polled(&self) -> Option<Instant> {
        self.snapshot.as_ref().map(|s| s.polled_at)
    }

    /// `true` if cached readings exist and are younger than [`POLL_TTL`].
    pub fn is_fresh(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| self.is_fresh_at(s))
    }

    /// Poll the plug if the cache is stale. Returns `true` if it was polled.
    pub async fn refresh(&mut self) -> Result<bool, PollError> {
        let stale = !self.is_fresh();
        self.current().await?;
        Ok(stale)
    }

    /// Current `(sysinfo, energy)` readings, polling first if stale.
    pub async fn read(&mut self) -> Result<(&Reading, &Reading), PollError> {
        let snapshot = self.current().await?;
        Ok((&snapshot.sysinfo, &snapshot.energy))
    }

    /// Current system info reading, polling first if stale.
    pub async fn sysinfo(&mut self) -> Result<&Reading, PollError> {
        Ok(&self.current().await?.sysinfo)
    }

    /// Current energy reading, polling first if stale.
    pub async fn energy(&mut self) -> Result<&Reading, PollError> {
        Ok(&self.current().await?.energy)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn is_fresh_at(&self, snapshot: &Snapshot) -> bool {
        self.clock.now().saturating_duration_since(snapshot.polled_at) < POLL_TTL
    }

    async fn current(&mut self) -> Result<&Snapshot, PollError> {
        match self.snapshot.take() {
            Some(snapshot) if self.is_fresh_at(&snapshot) => {
                trace!(
                    plug = %self.name,
                    since_ms = elapsed_millis(snapshot.polled_at, self.clock.now()),
                    "not polling plug, cached readings are fresh"
                );
                Ok(self.snapshot.insert(snapshot))
            }
            previous => match self.poll().await {
                Ok(snapshot) => Ok(self.snapshot.insert(snapshot)),
                Err(err) => {
                    self.snapshot = previous;
                    Err(err)
                }
            },
        }
    }

    async fn poll(&self) -> Result<Snapshot, PollError> {
        debug!(plug = %self.name, address = %self.address, "polling plug");

        let info = self
            .device
            .info()
            .await
            .map_err(|e| PollError::device(&self.name, e))?;
        let energy = self
            .device
            .energy()
            .await
            .map_err(|e| PollError::device(&self.name, e))?;

        Ok(Snapshot {
            sysinfo: extract_section(&self.name, &info, ReadingKind::SystemInfo)?,
            energy: extract_section(&self.name, &energy, ReadingKind::Energy)?,
            polled_at: self.clock.now(),
        })
    }
}

/// Response envelope `{ section: { method: {...} } }` for each reading.
fn envelope(kind: ReadingKind) -> (&'static str, &'static str) {
    match kind {
        ReadingKind::SystemInfo => ("system", "get_sysinfo"),
        ReadingKind::Energy => ("emeter", "get_realtime"),
    }
}

fn extract_section(plug: &str, response: &Value, kind: ReadingKind) -> Result<Reading, PollError> {
    let (section, method) = envelope(kind);
    let object = response
        .get(section)
        .and_then(|s| s.get(method))
        .and_then(Value::as_object)
        .ok_or_else(|| PollError::MalformedResponse {
            plug: plug.to_owned(),
            section,
            method,
        })?;

    if let Some(code) = object.get("err_code").and_then(Value::as_i64).filter(|c| *c != 0) {
        return Err(PollError::DeviceReported {
            plug: plug.to_owned(),
            kind,
            code,
            message: object
                .get("err_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned(),
        });
    }

    let reading = reading_from_object(object);
    if reading.is_empty() {
        return Err(PollError::EmptyReading {
            plug: plug.to_owned(),
            kind,
        });
    }
    Ok(reading)
}
