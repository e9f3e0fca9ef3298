//! Platform capability ports
//!
//! Everything the pipeline needs from its host environment (a clock, a
//! reachability signal, a persistent key-value store, an enrichment
//! snapshot) is a narrow trait. Queueing and delivery logic unit-tests
//! against fakes, and any embedding shell (desktop app, webview host,
//! instrumented CLI) can supply its own signals.
//!
//! Ports:
//! - [`Clock`]: event timestamps and duration math
//! - [`KeyValueStore`]: durable storage backing the offline queue
//! - [`PageContext`]: enrichment snapshot (page, user agent, viewport, accessibility)
//! - [`ConnectivityProbe`]: initial reachability at startup

mod store;

pub use store::{MemoryStore, SqliteStore};

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{AccessibilitySignals, Viewport};

// ============================================
// Clock
// ============================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================
// Key-value store
// ============================================

/// Durable string key-value storage.
///
/// The offline queue reads and rewrites its value wholesale, so the store
/// only needs atomic get/put/remove of complete values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================
// Page context
// ============================================

/// Enrichment snapshot taken at event construction time.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Current page path
    pub page: String,
    /// Host user agent string
    pub user_agent: String,
    /// Current viewport dimensions
    pub viewport: Viewport,
    /// Current accessibility signals
    pub accessibility: AccessibilitySignals,
}

/// Supplier of enrichment snapshots.
///
/// Implementations return the state *at call time*; events are never
/// updated retroactively when the host state changes afterwards.
pub trait PageContext: Send + Sync {
    fn snapshot(&self) -> PageSnapshot;
}

/// Host-updatable page context.
///
/// The embedding shell updates the current page, viewport and accessibility
/// signals as the user navigates; every snapshot reflects the latest values.
pub struct HostPageContext {
    state: Mutex<PageSnapshot>,
}

impl HostPageContext {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PageSnapshot {
                page: "/".to_string(),
                user_agent: user_agent.into(),
                viewport: Viewport {
                    width: 0,
                    height: 0,
                },
                accessibility: AccessibilitySignals::default(),
            }),
        }
    }

    pub fn set_page(&self, page: impl Into<String>) {
        self.state.lock().unwrap().page = page.into();
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().unwrap().viewport = viewport;
    }

    pub fn set_accessibility(&self, signals: AccessibilitySignals) {
        self.state.lock().unwrap().accessibility = signals;
    }
}

impl PageContext for HostPageContext {
    fn snapshot(&self) -> PageSnapshot {
        self.state.lock().unwrap().clone()
    }
}

// ============================================
// Connectivity probe
// ============================================

/// Initial network reachability, read once at service startup.
///
/// After startup, transitions arrive through
/// [`Telemetry::notify_online`](crate::Telemetry::notify_online) /
/// [`Telemetry::notify_offline`](crate::Telemetry::notify_offline).
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe with a fixed answer.
///
/// Hosts without a reachability signal assume online; tests pin either state.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe {
    pub online: bool,
}

impl ConnectivityProbe for StaticProbe {
    fn is_online(&self) -> bool {
        self.online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_page_context_snapshots_latest_state() {
        let ctx = HostPageContext::new("test-agent");
        ctx.set_page("/reports");
        ctx.set_viewport(Viewport {
            width: 800,
            height: 600,
        });

        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.page, "/reports");
        assert_eq!(snapshot.viewport.width, 800);
        assert_eq!(snapshot.user_agent, "test-agent");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let ctx = HostPageContext::new("test-agent");
        let before = ctx.snapshot();
        ctx.set_page("/later");
        assert_eq!(before.page, "/");
    }

    #[test]
    fn test_static_probe() {
        assert!(StaticProbe { online: true }.is_online());
        assert!(!StaticProbe { online: false }.is_online());
    }
}
