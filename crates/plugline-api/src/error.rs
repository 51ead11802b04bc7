use thiserror::Error;

/// Top-level error type for the `plugline-api` crate.
///
/// Covers every failure mode of a single request/response exchange with a
/// plug. `plugline-core` wraps these into per-plug poll errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// TCP connection could not be established (DNS failure, refused, unreachable).
    #[error("Cannot connect to plug at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failed on an established connection.
    #[error("I/O error talking to plug: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange did not complete within the configured timeout.
    #[error("Plug request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Framing ─────────────────────────────────────────────────────
    /// Frame length exceeds what we are willing to send or buffer.
    #[error("Frame of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { length: usize, limit: usize },

    // ── Data ────────────────────────────────────────────────────────
    /// Decrypted response was not valid JSON, with the raw text for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the plug could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. })
    }
}
