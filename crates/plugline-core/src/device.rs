// ── Device collaborator ──
//
// The core only needs two raw requests and a timeout knob from a plug.
// `plugline_api::SmartPlug` is the production implementation; tests plug in
// scripted fakes.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use plugline_api::SmartPlug;

/// A power-metering plug that can be asked for its readings.
///
/// `info()` must resolve to `{"system":{"get_sysinfo":{...}}}` and
/// `energy()` to `{"emeter":{"get_realtime":{...}}}`.
pub trait Device: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn info(&self) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    fn energy(&self) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration);
}

impl Device for SmartPlug {
    type Error = plugline_api::Error;

    async fn info(&self) -> Result<Value, Self::Error> {
        SmartPlug::info(self).await
    }

    async fn energy(&self) -> Result<Value, Self::Error> {
        SmartPlug::energy(self).await
    }

    fn timeout(&self) -> Duration {
        SmartPlug::timeout(self)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        SmartPlug::set_timeout(self, timeout);
    }
}
