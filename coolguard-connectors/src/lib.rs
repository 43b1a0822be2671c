//! Outbound Connectors for CoolGuard
//!
//! ## Overview
//!
//! The control core never performs I/O; it hands back [`Command`]s. This
//! crate is the other side of that boundary:
//!
//! ```text
//!   process() ──► Commands ──► dispatch ──┬──► log (local)
//!                                         ├──► ThresholdTarget (relay driver)
//!                                         └──► NotificationSink ──► Transport ──► webhook
//!                                               (buffer, retry,      (HTTP POST
//!                                                backoff)             {"text": ...})
//! ```
//!
//! ## Delivery Model
//!
//! Diagnostics are best effort. The sink tries every message once as soon
//! as the worker is free; a failed message is retried with exponential
//! backoff until it is delivered or has used up its retries. Undelivered
//! messages share one bound and the oldest is evicted first. Nothing here
//! ever blocks or fails the control tick: [`NotificationSink::write`] only
//! appends to that queue under a short lock and wakes the worker.
//!
//! ```text
//! write ──► Pending ──ok──► Sent
//!              │
//!            fail
//!              ▼
//!           Buffered ──retry ok──► Sent
//!              │
//!        retries exhausted / evicted
//!              ▼
//!           Dropped
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use coolguard_connectors::{
//!     http::{HttpConfig, HttpTransport},
//!     kv::MemoryStore,
//!     sink::{NotificationSink, SinkConfig},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::from_iter([("notify.url", "https://hooks.example.com/T000/B000")]);
//! let transport = HttpTransport::new(HttpConfig::default().timeout_secs(10))?;
//!
//! let sink = NotificationSink::start(SinkConfig::new("notify.url"), &store, transport);
//! let _ = sink.write("Relay stuck: commanded on, reported off for 12 s");
//! # Ok(())
//! # }
//! ```
//!
//! [`Command`]: coolguard_core::Command

pub mod dispatch;
pub mod kv;
pub mod sink;

#[cfg(feature = "http")]
pub mod http;

pub use dispatch::{Dispatcher, ThresholdTarget};
pub use kv::{EnvStore, KeyValueStore, MemoryStore};
pub use sink::{DeliveryQueue, NotificationSink, SinkConfig, SinkError, SinkStats};

use thiserror::Error;

/// Errors reported by a [`Transport`]
///
/// Every variant counts as a failed delivery; the sink does not distinguish
/// between them beyond logging.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-success status
    #[error("Server returned status {status}")]
    Status { status: u16 },

    /// Transport is misconfigured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Delivers one JSON body to an endpoint
///
/// Implementations must not retry on their own; retries and backoff belong
/// to the sink.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` (a JSON document) to `url`
    async fn post_json(&self, url: &str, body: String) -> Result<(), TransportError>;
}
