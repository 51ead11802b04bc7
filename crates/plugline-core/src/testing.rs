// Scripted in-memory plug for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;

use crate::device::Device;

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct FakeError(pub String);

/// Cloned handles share call counters and scripted responses.
#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    sysinfo: Arc<Mutex<Value>>,
    energy: Arc<Mutex<Value>>,
    failing: Arc<AtomicBool>,
    info_calls: Arc<AtomicUsize>,
    energy_calls: Arc<AtomicUsize>,
    timeout: Duration,
}

impl FakeDevice {
    /// Device answering with the given `get_sysinfo` / `get_realtime` bodies.
    pub(crate) fn new(sysinfo: Value, energy: Value) -> Self {
        Self::raw(
            json!({ "system": { "get_sysinfo": sysinfo } }),
            json!({ "emeter": { "get_realtime": energy } }),
        )
    }

    /// Device answering with complete response documents.
    pub(crate) fn raw(info_response: Value, energy_response: Value) -> Self {
        Self {
            sysinfo: Arc::new(Mutex::new(info_response)),
            energy: Arc::new(Mutex::new(energy_response)),
            failing: Arc::new(AtomicBool::new(false)),
            info_calls: Arc::new(AtomicUsize::new(0)),
            energy_calls: Arc::new(AtomicUsize::new(0)),
            timeout: Duration::from_secs(3),
        }
    }

    pub(crate) fn kitchen() -> Self {
        Self::new(
            json!({ "alias": "Kitchen Plug", "relay_state": 1, "on_time": 120, "rssi": -50 }),
            json!({ "voltage_mv": 230_000, "current_ma": 500, "power_mw": 115_000 }),
        )
    }

    pub(crate) fn set_energy(&self, energy: Value) {
        *self.energy.lock().unwrap_or_else(PoisonError::into_inner) =
            json!({ "emeter": { "get_realtime": energy } });
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn energy_calls(&self) -> usize {
        self.energy_calls.load(Ordering::SeqCst)
    }

    fn respond(&self, slot: &Mutex<Value>) -> Result<Value, FakeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FakeError("connection refused".into()));
        }
        Ok(slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl Device for FakeDevice {
    type Error = FakeError;

    async fn info(&self) -> Result<Value, FakeError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.sysinfo)
    }

    async fn energy(&self) -> Result<Value, FakeError> {
        self.energy_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.energy)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
