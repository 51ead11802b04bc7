//! Async client for the TP-Link smart plug local protocol (HS100/HS110 family).
//!
//! The plug listens on TCP port 9999 and speaks JSON, obfuscated with an XOR
//! autokey cipher and prefixed with a 4-byte big-endian length:
//!
//! - **[`SmartPlug`]**: One-request-per-connection client. Every call opens a
//!   fresh TCP connection, sends one frame, reads one frame, and closes.
//!   The whole exchange is bounded by the client's timeout.
//!
//! - **[`protocol`]**: The cipher and framing primitives, exposed so tests and
//!   tooling can speak to (or impersonate) a plug without a network.
//!
//! Responses are returned as raw [`serde_json::Value`]s. Interpreting the
//! `system` / `emeter` envelopes is left to `plugline-core`.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::{DEFAULT_PORT, DEFAULT_TIMEOUT, SmartPlug};
pub use error::Error;
