//! Delivery pipeline and batch sync
//!
//! One background worker owns every network decision. Jobs arrive on an
//! unbounded channel from the tracking surface; sequential processing
//! preserves call order and makes the worker the offline queue's only
//! writer.
//!
//! Per-event routing, evaluated in order:
//! 1. development mode: discard for network purposes (the event already
//!    reached the in-memory log, so aggregates stay meaningful);
//! 2. offline: append to the offline queue;
//! 3. online: send the single event; on failure fall back to the offline
//!    queue, so no event is silently lost to a failed online attempt.
//!
//! Error records follow the same dev-mode/offline gating but are never
//! queued: one attempt, then dropped.
//!
//! None of these paths propagate errors; failures are logged at warning
//! level and swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::Mode;
use crate::queue::OfflineQueue;
use crate::transport::Transport;
use crate::types::{ErrorRecord, Event};

/// Work submitted to the pipeline worker.
pub(crate) enum Job {
    /// Route one event (deliver, buffer, or suppress)
    Deliver(Event),
    /// Single-attempt error report
    Report(ErrorRecord),
    /// Batch sync of the offline queue
    Flush,
    /// Completion barrier: acknowledged once all prior jobs are processed
    Barrier(oneshot::Sender<()>),
}

/// Owns routing, the offline queue, and batch sync.
pub(crate) struct DeliveryPipeline {
    mode: Mode,
    online: Arc<AtomicBool>,
    queue: OfflineQueue,
    transport: Arc<dyn Transport>,
}

impl DeliveryPipeline {
    pub(crate) fn new(
        mode: Mode,
        online: Arc<AtomicBool>,
        queue: OfflineQueue,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            mode,
            online,
            queue,
            transport,
        }
    }

    /// Worker loop. Runs until the job channel closes or the task is aborted.
    pub(crate) async fn run(self, mut jobs: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = jobs.recv().await {
            match job {
                Job::Deliver(event) => self.deliver(event).await,
                Job::Report(record) => self.report(record).await,
                Job::Flush => self.flush().await,
                Job::Barrier(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        tracing::debug!("Delivery pipeline worker stopped");
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Route one event. Terminal in all three outcomes; never errors.
    pub(crate) async fn deliver(&self, event: Event) {
        if self.mode.is_development() {
            tracing::trace!(category = %event.category, action = %event.action, "Dev mode, event suppressed");
            return;
        }

        if !self.is_online() {
            self.queue.push(event);
            return;
        }

        if let Err(e) = self.transport.send_event(&event).await {
            tracing::warn!(
                category = %event.category,
                action = %event.action,
                error = %e,
                "Event send failed, buffering offline"
            );
            self.queue.push(event);
        }
    }

    /// Single-attempt error report. Unlike events, never queued for retry.
    pub(crate) async fn report(&self, record: ErrorRecord) {
        if self.mode.is_development() {
            tracing::trace!("Dev mode, error report suppressed");
            return;
        }

        if !self.is_online() {
            tracing::debug!("Offline, dropping error report");
            return;
        }

        if let Err(e) = self.transport.send_error(&record).await {
            tracing::warn!(error = %e, "Error report send failed, dropping");
        }
    }

    /// Batch sync: drain the offline queue in one request.
    ///
    /// The queue is cleared only on an acknowledged success; on failure it
    /// is left untouched for the next online transition. Queues spanning
    /// multiple sessions (durable across restarts) get no special handling.
    pub(crate) async fn flush(&self) {
        if self.mode.is_development() {
            tracing::trace!("Dev mode, batch sync suppressed");
            return;
        }

        let events = self.queue.load();
        if events.is_empty() {
            return;
        }

        match self.transport.send_batch(&events).await {
            Ok(()) => {
                self.queue.clear();
                tracing::info!(count = events.len(), "Flushed offline queue");
            }
            Err(e) => {
                tracing::warn!(
                    count = events.len(),
                    error = %e,
                    "Batch sync failed, queue retained for retry"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::platform::{Clock, MemoryStore, PageSnapshot, SystemClock};
    use crate::types::{AccessibilitySignals, Viewport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every attempt; configurable to fail per endpoint.
    #[derive(Default)]
    struct RecordingTransport {
        fail_events: bool,
        fail_errors: bool,
        fail_batches: bool,
        events: Mutex<Vec<Event>>,
        errors: Mutex<Vec<ErrorRecord>>,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_event(&self, event: &Event) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail_events {
                Err(Error::Transport("API error (500): boom".to_string()))
            } else {
                Ok(())
            }
        }

        async fn send_error(&self, record: &ErrorRecord) -> Result<()> {
            self.errors.lock().unwrap().push(record.clone());
            if self.fail_errors {
                Err(Error::Transport("API error (500): boom".to_string()))
            } else {
                Ok(())
            }
        }

        async fn send_batch(&self, events: &[Event]) -> Result<()> {
            self.batches.lock().unwrap().push(events.len());
            if self.fail_batches {
                Err(Error::Transport("API error (503): unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        pipeline: DeliveryPipeline,
        transport: Arc<RecordingTransport>,
        store: Arc<MemoryStore>,
    }

    fn fixture(mode: Mode, online: bool, transport: RecordingTransport) -> Fixture {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryStore::new());
        let pipeline = DeliveryPipeline::new(
            mode,
            Arc::new(AtomicBool::new(online)),
            OfflineQueue::new(store.clone(), 100),
            transport.clone(),
        );
        Fixture {
            pipeline,
            transport,
            store,
        }
    }

    fn queue_of(f: &Fixture) -> OfflineQueue {
        OfflineQueue::new(f.store.clone(), 100)
    }

    fn make_event(value: i64) -> Event {
        Event::build(
            "test",
            "a",
            None,
            Some(value),
            SystemClock.now(),
            "session-1",
            None,
            PageSnapshot {
                page: "/".to_string(),
                user_agent: "test".to_string(),
                viewport: Viewport {
                    width: 0,
                    height: 0,
                },
                accessibility: AccessibilitySignals::default(),
            },
        )
    }

    fn make_record() -> ErrorRecord {
        ErrorRecord {
            message: "boom".to_string(),
            stack: None,
            context: None,
            timestamp: SystemClock.now(),
            url: "/".to_string(),
            user_agent: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dev_mode_suppresses_sends_and_queueing() {
        let f = fixture(Mode::Development, true, RecordingTransport::default());

        f.pipeline.deliver(make_event(1)).await;

        assert!(f.transport.events.lock().unwrap().is_empty());
        assert!(queue_of(&f).is_empty());
    }

    #[tokio::test]
    async fn test_offline_event_is_queued() {
        let f = fixture(Mode::Production, false, RecordingTransport::default());

        f.pipeline.deliver(make_event(1)).await;

        assert!(f.transport.events.lock().unwrap().is_empty());
        assert_eq!(queue_of(&f).len(), 1);
    }

    #[tokio::test]
    async fn test_online_event_is_sent_not_queued() {
        let f = fixture(Mode::Production, true, RecordingTransport::default());

        f.pipeline.deliver(make_event(1)).await;

        assert_eq!(f.transport.events.lock().unwrap().len(), 1);
        assert!(queue_of(&f).is_empty());
    }

    #[tokio::test]
    async fn test_failed_online_send_falls_back_to_queue() {
        let f = fixture(
            Mode::Production,
            true,
            RecordingTransport {
                fail_events: true,
                ..Default::default()
            },
        );

        f.pipeline.deliver(make_event(42)).await;

        assert_eq!(f.transport.events.lock().unwrap().len(), 1);
        let queued = queue_of(&f).load();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].value, Some(42));
    }

    #[tokio::test]
    async fn test_flush_empty_queue_makes_no_request() {
        let f = fixture(Mode::Production, true, RecordingTransport::default());

        f.pipeline.flush().await;

        assert!(f.transport.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_clears_queue_on_success() {
        let f = fixture(Mode::Production, true, RecordingTransport::default());
        queue_of(&f).push(make_event(1));
        queue_of(&f).push(make_event(2));

        f.pipeline.flush().await;

        assert_eq!(*f.transport.batches.lock().unwrap(), vec![2]);
        assert!(queue_of(&f).is_empty());
    }

    #[tokio::test]
    async fn test_flush_failure_leaves_queue_untouched() {
        let f = fixture(
            Mode::Production,
            true,
            RecordingTransport {
                fail_batches: true,
                ..Default::default()
            },
        );
        queue_of(&f).push(make_event(1));
        queue_of(&f).push(make_event(2));
        let before: Vec<_> = queue_of(&f).load().iter().map(|e| e.event_hash.clone()).collect();

        f.pipeline.flush().await;

        let after: Vec<_> = queue_of(&f).load().iter().map(|e| e.event_hash.clone()).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_flush_suppressed_in_dev_mode() {
        let f = fixture(Mode::Development, true, RecordingTransport::default());
        queue_of(&f).push(make_event(1));

        f.pipeline.flush().await;

        assert!(f.transport.batches.lock().unwrap().is_empty());
        assert_eq!(queue_of(&f).len(), 1);
    }

    #[tokio::test]
    async fn test_error_report_is_single_attempt() {
        let f = fixture(
            Mode::Production,
            true,
            RecordingTransport {
                fail_errors: true,
                ..Default::default()
            },
        );

        f.pipeline.report(make_record()).await;

        // One attempt, nothing queued for retry
        assert_eq!(f.transport.errors.lock().unwrap().len(), 1);
        assert!(queue_of(&f).is_empty());
    }

    #[tokio::test]
    async fn test_offline_error_report_is_dropped() {
        let f = fixture(Mode::Production, false, RecordingTransport::default());

        f.pipeline.report(make_record()).await;

        assert!(f.transport.errors.lock().unwrap().is_empty());
        assert!(queue_of(&f).is_empty());
    }
}
