//! Telemetry service
//!
//! [`Telemetry`] is the public face of the pipeline: an explicitly
//! constructed instance the host passes around (no hidden global). It owns
//! the session identity, the in-memory event log, the connectivity flag and
//! the background delivery worker.
//!
//! Tracking calls are synchronous and never block on the network: they
//! enrich the event, append it to the log, and hand it to the worker over
//! a channel. Nothing that happens downstream (offline buffering, failed
//! sends, queue eviction) ever surfaces to the caller.
//!
//! ## Lifecycle
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
//! let platform = Platform::host(&config, page.clone())?;
//! let telemetry = Telemetry::init(config, platform);
//!
//! telemetry.track_navigation("/dashboard");
//! telemetry.track_feature_usage("export", "clicked");
//!
//! telemetry.shutdown();
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{Config, TelemetryConfig};
use crate::error::Result;
use crate::perf::{self, PerfEntry};
use crate::pipeline::{DeliveryPipeline, Job};
use crate::platform::{
    Clock, ConnectivityProbe, KeyValueStore, PageContext, SqliteStore, StaticProbe, SystemClock,
};
use crate::queue::OfflineQueue;
use crate::session::SessionContext;
use crate::stats::{self, UserBehaviorStats};
use crate::transport::{HttpTransport, NoopTransport, Transport};
use crate::types::{ErrorRecord, Event};

/// Platform capabilities supplied by the embedding host.
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub page: Arc<dyn PageContext>,
    pub store: Arc<dyn KeyValueStore>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub transport: Arc<dyn Transport>,
}

impl Platform {
    /// Production wiring: system clock, SQLite store in the XDG data dir,
    /// HTTP transport, online assumed until the host signals otherwise.
    ///
    /// Development-mode configs without a backend get a no-op transport;
    /// the pipeline suppresses traffic before it anyway.
    pub fn host(config: &TelemetryConfig, page: Arc<dyn PageContext>) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn Transport> = match &config.base_url {
            Some(_) => Arc::new(HttpTransport::new(config)?),
            None => Arc::new(NoopTransport),
        };

        Ok(Self {
            clock: Arc::new(SystemClock),
            page,
            store: Arc::new(SqliteStore::open(&Config::store_path())?),
            probe: Arc::new(StaticProbe { online: true }),
            transport,
        })
    }
}

/// The telemetry pipeline: capture, enrich, buffer, deliver.
pub struct Telemetry {
    config: TelemetryConfig,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    page: Arc<dyn PageContext>,
    online: Arc<AtomicBool>,
    log: Mutex<VecDeque<Event>>,
    jobs: mpsc::UnboundedSender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Telemetry {
    /// Construct the service and start its delivery worker.
    ///
    /// Must run inside a tokio runtime. Connectivity is initialized from
    /// the platform probe; a panic hook is installed when
    /// `capture_panics` is set. Registration happens exactly once; there
    /// is no re-subscription during the instance's lifetime.
    pub fn init(config: TelemetryConfig, platform: Platform) -> Arc<Self> {
        let online = Arc::new(AtomicBool::new(platform.probe.is_online()));

        let (jobs, job_rx) = mpsc::unbounded_channel();
        let queue = OfflineQueue::new(platform.store, config.queue_capacity);
        let pipeline =
            DeliveryPipeline::new(config.mode, online.clone(), queue, platform.transport);
        let worker = tokio::spawn(pipeline.run(job_rx));

        let session = SessionContext::new(platform.clock.as_ref());

        let service = Arc::new(Self {
            session,
            clock: platform.clock,
            page: platform.page,
            online,
            log: Mutex::new(VecDeque::new()),
            jobs,
            worker: Mutex::new(Some(worker)),
            config,
        });

        if service.config.capture_panics {
            service.install_panic_hook();
        }

        tracing::info!(
            session_id = %service.session.id(),
            mode = ?service.config.mode,
            online = service.is_online(),
            "Telemetry pipeline initialized"
        );

        service
    }

    /// Stop the delivery worker, abandoning any in-flight send.
    ///
    /// Abandoned events are not requeued. Idempotent.
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            worker.abort();
            tracing::info!("Telemetry pipeline shut down");
        }
    }

    /// Wait until every previously submitted job has been processed.
    ///
    /// Useful before teardown and in tests; returns immediately if the
    /// worker is gone.
    pub async fn drain(&self) {
        let (ack, done) = oneshot::channel();
        if self.jobs.send(Job::Barrier(ack)).is_ok() {
            let _ = done.await;
        }
    }

    // ============================================
    // Event factory
    // ============================================

    /// Record one telemetry event.
    ///
    /// Never fails: the event is enriched with a snapshot of the current
    /// host context, appended to the in-memory log, and routed by the
    /// delivery worker. Inputs are unconstrained.
    pub fn track_event(&self, category: &str, action: &str, label: Option<&str>, value: Option<i64>) {
        let event = Event::build(
            category,
            action,
            label,
            value,
            self.clock.now(),
            self.session.id(),
            self.session.user_id(),
            self.page.snapshot(),
        );

        {
            let mut log = self.log.lock().unwrap();
            log.push_back(event.clone());
            while log.len() > self.config.max_log_events {
                log.pop_front();
            }
        }

        if self.jobs.send(Job::Deliver(event)).is_err() {
            tracing::debug!("Pipeline worker stopped, event not routed");
        }
    }

    /// Record a page view.
    pub fn track_navigation(&self, path: &str) {
        self.track_event("navigation", "page_view", Some(path), None);
    }

    /// Record usage of a named feature.
    pub fn track_feature_usage(&self, feature: &str, action: &str) {
        self.track_event("feature", action, Some(feature), None);
    }

    /// Record a form interaction (focus, submit, abandon, ...).
    pub fn track_form_interaction(&self, form: &str, action: &str) {
        self.track_event("form", action, Some(form), None);
    }

    /// Record a search with its result count.
    pub fn track_search(&self, query: &str, result_count: i64) {
        self.track_event("search", "query", Some(query), Some(result_count));
    }

    /// Record a file download.
    pub fn track_download(&self, file: &str) {
        self.track_event("download", "file", Some(file), None);
    }

    /// Record a detected accessibility issue.
    ///
    /// Issues lower the aggregate accessibility score.
    pub fn track_accessibility_issue(&self, issue: &str) {
        self.track_event("accessibility", "issue_detected", Some(issue), None);
    }

    // ============================================
    // Error capture
    // ============================================

    /// Capture a failure.
    ///
    /// Records a `category="error"` event through the normal pipeline
    /// (offline-buffered like any event) and independently attempts one
    /// send of the normalized record to the error endpoint. That second
    /// path is deliberately weaker: offline or failed error reports are
    /// dropped, not retried.
    pub fn track_error(&self, message: &str, stack: Option<&str>, context: Option<&str>) {
        self.track_event("error", context.unwrap_or("uncaught"), Some(message), None);

        let snapshot = self.page.snapshot();
        let record = ErrorRecord {
            message: message.to_string(),
            stack: stack.map(str::to_string),
            context: context.map(str::to_string),
            timestamp: self.clock.now(),
            url: snapshot.page,
            user_agent: snapshot.user_agent,
        };

        if self.jobs.send(Job::Report(record)).is_err() {
            tracing::debug!("Pipeline worker stopped, error report dropped");
        }
    }

    /// Observe a spawned task and report its panic as an error record.
    ///
    /// The task-level analog of the panic hook: fire-and-forget background
    /// work wrapped in `watch` no longer fails silently.
    pub fn watch(self: &Arc<Self>, handle: JoinHandle<()>) {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    let message = payload_message(err.into_panic().as_ref());
                    if let Some(service) = service.upgrade() {
                        service.track_error(&message, None, Some("task_panic"));
                    }
                }
            }
        });
    }

    fn install_panic_hook(self: &Arc<Self>) {
        let service = Arc::downgrade(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(service) = service.upgrade() {
                let message = payload_message(info.payload());
                let location = info.location().map(|l| l.to_string());
                service.track_error(&message, location.as_deref(), Some("panic"));
            }
            previous(info);
        }));
    }

    // ============================================
    // Session & connectivity
    // ============================================

    /// The stable session id carried by every event from this instance.
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Associate an authenticated user with subsequently recorded events.
    pub fn set_user_id(&self, user_id: impl Into<String>) {
        self.session.set_user_id(user_id);
    }

    /// Current connectivity belief.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Host signal: the network became reachable.
    ///
    /// An offline→online transition schedules exactly one batch sync of
    /// the offline queue, regardless of how many events are queued.
    /// Repeated calls while already online do nothing.
    pub fn notify_online(&self) {
        if !self.online.swap(true, Ordering::SeqCst) {
            tracing::info!("Connectivity restored, scheduling batch sync");
            if self.jobs.send(Job::Flush).is_err() {
                tracing::debug!("Pipeline worker stopped, batch sync skipped");
            }
        }
    }

    /// Host signal: the network became unreachable.
    pub fn notify_offline(&self) {
        if self.online.swap(false, Ordering::SeqCst) {
            tracing::debug!("Connectivity lost, buffering events offline");
        }
    }

    // ============================================
    // Performance instrumentation
    // ============================================

    /// Feed one host performance signal into the pipeline.
    ///
    /// Entries map to `category="performance"` events per the Core Web
    /// Vitals rules in [`crate::perf`]; entries without a mapping are
    /// dropped.
    pub fn record_perf_entry(&self, entry: &PerfEntry) {
        if let Some(metric) = perf::map_entry(entry) {
            self.track_event(
                "performance",
                metric.action,
                Some(metric.label),
                Some(metric.value),
            );
        }
    }

    // ============================================
    // Aggregates
    // ============================================

    /// Compute behavioral aggregates over the in-memory event log.
    ///
    /// Recomputed from scratch on every call; never cached.
    pub fn stats(&self) -> UserBehaviorStats {
        let log = self.log.lock().unwrap();
        stats::compute(log.iter(), self.clock.now())
    }
}

/// Best-effort extraction of a panic payload message.
fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::platform::{HostPageContext, MemoryStore};
    use crate::types::Viewport;

    fn test_service(mutate: impl FnOnce(&mut TelemetryConfig)) -> Arc<Telemetry> {
        let mut config = TelemetryConfig {
            mode: Mode::Development,
            capture_panics: false,
            ..Default::default()
        };
        mutate(&mut config);

        let page = Arc::new(HostPageContext::new("pagepulse-test/1.0"));
        page.set_viewport(Viewport {
            width: 1024,
            height: 768,
        });

        Telemetry::init(
            config,
            Platform {
                clock: Arc::new(SystemClock),
                page,
                store: Arc::new(MemoryStore::new()),
                probe: Arc::new(StaticProbe { online: true }),
                transport: Arc::new(NoopTransport),
            },
        )
    }

    #[tokio::test]
    async fn test_events_share_one_session_id() {
        let telemetry = test_service(|_| {});

        telemetry.track_navigation("/a");
        telemetry.track_feature_usage("export", "clicked");
        telemetry.track_search("report", 3);

        let log = telemetry.log.lock().unwrap();
        assert_eq!(log.len(), 3);
        for event in log.iter() {
            assert_eq!(event.session_id, telemetry.session_id());
        }
    }

    #[tokio::test]
    async fn test_user_id_is_not_retroactive() {
        let telemetry = test_service(|_| {});

        telemetry.track_navigation("/before");
        telemetry.set_user_id("user-9");
        telemetry.track_navigation("/after");

        let log = telemetry.log.lock().unwrap();
        assert!(log[0].user_id.is_none());
        assert_eq!(log[1].user_id.as_deref(), Some("user-9"));
    }

    #[tokio::test]
    async fn test_log_is_bounded_with_oldest_first_eviction() {
        let telemetry = test_service(|c| c.max_log_events = 3);

        for i in 1..=5 {
            telemetry.track_event("test", "a", None, Some(i));
        }

        let log = telemetry.log.lock().unwrap();
        let values: Vec<_> = log.iter().map(|e| e.value.unwrap()).collect();
        assert_eq!(values, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_perf_entry_becomes_performance_event() {
        let telemetry = test_service(|_| {});

        telemetry.record_perf_entry(&PerfEntry::Paint {
            name: "first-contentful-paint".to_string(),
            start_time: 123.4,
        });

        let log = telemetry.log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].category, "performance");
        assert_eq!(log[0].action, "fcp");
        assert_eq!(log[0].label.as_deref(), Some("First Contentful Paint"));
        assert_eq!(log[0].value, Some(123));
    }

    #[tokio::test]
    async fn test_unmapped_perf_entry_is_dropped() {
        let telemetry = test_service(|_| {});

        telemetry.record_perf_entry(&PerfEntry::Paint {
            name: "first-paint".to_string(),
            start_time: 50.0,
        });

        assert!(telemetry.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_error_records_error_event() {
        let telemetry = test_service(|_| {});

        telemetry.track_error("boom", None, Some("render"));

        let log = telemetry.log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].category, "error");
        assert_eq!(log[0].action, "render");
        assert_eq!(log[0].label.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_enrichment_snapshots_page_context() {
        let telemetry = test_service(|_| {});

        telemetry.track_navigation("/first");

        let log = telemetry.log.lock().unwrap();
        assert_eq!(log[0].user_agent, "pagepulse-test/1.0");
        assert_eq!(log[0].viewport.width, 1024);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let telemetry = test_service(|_| {});
        telemetry.shutdown();
        telemetry.shutdown();

        // Tracking after shutdown still reaches the log
        telemetry.track_navigation("/late");
        assert_eq!(telemetry.stats().page_views, 1);
    }
}
