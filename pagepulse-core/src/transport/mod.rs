//! Delivery transport
//!
//! The pipeline talks to the analytics backend through the [`Transport`]
//! port, so delivery logic unit-tests against fakes and hosts can swap the
//! wire protocol. [`HttpTransport`] is the production implementation.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ErrorRecord, Event};

/// Outbound delivery operations.
///
/// All three are single-shot: retry policy (offline queueing, batch sync)
/// lives in the pipeline, not in the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one event.
    async fn send_event(&self, event: &Event) -> Result<()>;

    /// Deliver one error record.
    async fn send_error(&self, record: &ErrorRecord) -> Result<()>;

    /// Deliver the entire offline queue as a single batch.
    async fn send_batch(&self, events: &[Event]) -> Result<()>;
}

/// Transport for hosts with no backend configured (development mode).
///
/// The pipeline suppresses sends before the transport in development mode,
/// so this exists to satisfy wiring, not to be called on the hot path.
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send_event(&self, _event: &Event) -> Result<()> {
        Ok(())
    }

    async fn send_error(&self, _record: &ErrorRecord) -> Result<()> {
        Ok(())
    }

    async fn send_batch(&self, _events: &[Event]) -> Result<()> {
        Ok(())
    }
}
