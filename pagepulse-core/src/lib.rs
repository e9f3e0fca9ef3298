//! # pagepulse-core
//!
//! Core library for pagepulse - an embeddable usage-telemetry pipeline.
//!
//! This library provides:
//! - Event capture with session, page and accessibility enrichment
//! - Connectivity-aware delivery with a bounded, durable offline queue
//! - Batch sync on reconnect with at-least-once semantics
//! - Error capture (panic hook, watched tasks) with single-attempt reporting
//! - On-demand behavioral aggregates
//!
//! ## Architecture
//!
//! Events flow through three stages:
//! - **Capture:** tracking calls build enriched, immutable events and append
//!   them to a bounded in-memory log (never blocking on the network)
//! - **Routing:** a background worker delivers each event, buffers it
//!   offline, or suppresses it in development mode
//! - **Sync:** an offline→online transition drains the durable queue as one
//!   batch, cleared only on acknowledged success
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagepulse_core::{HostPageContext, Platform, Telemetry, TelemetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> pagepulse_core::Result<()> {
//! let config = TelemetryConfig {
//!     base_url: Some("https://analytics.example.com".to_string()),
//!     ..Default::default()
//! };
//! let page = Arc::new(HostPageContext::new("my-app/1.0"));
//! let platform = Platform::host(&config, page)?;
//!
//! let telemetry = Telemetry::init(config, platform);
//! telemetry.track_navigation("/home");
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, LoggingConfig, Mode, TelemetryConfig};
pub use error::{Error, Result};
pub use perf::{PerfEntry, PerfMetric};
pub use platform::{
    Clock, ConnectivityProbe, HostPageContext, KeyValueStore, MemoryStore, PageContext,
    PageSnapshot, SqliteStore, StaticProbe, SystemClock,
};
pub use queue::{OfflineQueue, OFFLINE_KEY};
pub use service::{Platform, Telemetry};
pub use session::SessionContext;
pub use stats::UserBehaviorStats;
pub use transport::{HttpTransport, NoopTransport, Transport};
pub use types::{AccessibilitySignals, ErrorRecord, Event, Viewport};

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod perf;
pub mod platform;
pub mod queue;
pub mod session;
pub mod stats;
pub mod transport;
pub mod types;

mod pipeline;
mod service;
