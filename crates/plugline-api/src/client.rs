// Smart plug TCP client
//
// One connection per request: the plug closes the socket after answering,
// so there is nothing to pool. Host resolution happens inside
// `TcpStream::connect` on every call.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::Error;
use crate::protocol;

/// Port the plug's local JSON service listens on.
pub const DEFAULT_PORT: u16 = 9999;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for a single TP-Link smart plug.
#[derive(Debug, Clone)]
pub struct SmartPlug {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmartPlug {
    /// Create a client for `address`.
    ///
    /// Accepts a host name, an IPv4/IPv6 address, or `host:port`. Without an
    /// explicit port the plug's default port 9999 is used.
    pub fn new(address: &str) -> Self {
        let (host, port) = split_address(address);
        Self {
            host,
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the port (mostly useful for tests against a local fake plug).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// `host:port` as displayed in errors and logs.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Fetch system information: `{"system":{"get_sysinfo":{...}}}`.
    pub async fn info(&self) -> Result<Value, Error> {
        self.send(&json!({ "system": { "get_sysinfo": {} } })).await
    }

    /// Fetch realtime energy readings: `{"emeter":{"get_realtime":{...}}}`.
    pub async fn energy(&self) -> Result<Value, Error> {
        self.send(&json!({ "emeter": { "get_realtime": {} } })).await
    }

    /// Send an arbitrary command and return the decoded response.
    pub async fn send(&self, request: &Value) -> Result<Value, Error> {
        let payload = request.to_string();
        debug!(address = %self.address(), request = %payload, "sending plug request");

        let body = tokio::time::timeout(self.timeout, self.exchange(payload.as_bytes()))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        trace!(address = %self.address(), response = %body, "plug response");
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Transport mechanics ──────────────────────────────────────────

    async fn exchange(&self, payload: &[u8]) -> Result<String, Error> {
        let frame = protocol::encode_frame(payload)?;

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| Error::Connect {
                address: self.address(),
                source,
            })?;

        stream.write_all(&frame).await?;
        stream.flush().await?;

        let length = usize::try_from(stream.read_u32().await?).unwrap_or(usize::MAX);
        protocol::check_frame_len(length)?;

        let mut cipher = vec![0u8; length];
        stream.read_exact(&mut cipher).await?;

        let plain = protocol::decrypt(&cipher);
        Ok(String::from_utf8_lossy(&plain).into_owned())
    }
}

/// Split `host[:port]`, leaving bare IPv6 addresses intact.
fn split_address(address: &str) -> (String, u16) {
    let address = address.trim();
    if let Ok(socket) = address.parse::<SocketAddr>() {
        return (socket.ip().to_string(), socket.port());
    }
    if let Some((host, port)) = address.rsplit_once(':') {
        if !host.contains(':') {
            if let Ok(port) = port.parse::<u16>() {
                return (host.to_owned(), port);
            }
        }
    }
    let host = address.trim_start_matches('[').trim_end_matches(']');
    (host.to_owned(), DEFAULT_PORT)
}
