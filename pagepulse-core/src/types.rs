//! Core domain types for pagepulse
//!
//! These types form the wire contract with the analytics backend. Field
//! names serialize in camelCase to match the ingestion API.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One enriched telemetry record: an interaction, performance measurement, or accessibility observation |
//! | **Session** | The lifetime of one service instance, identified by a stable session id |
//! | **ErrorRecord** | A normalized uncaught failure, delivered independently of the event stream |
//! | **Offline Queue** | The bounded, durable buffer of events awaiting delivery |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::platform::PageSnapshot;

// ============================================
// Event
// ============================================

/// Viewport dimensions at event construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Accessibility signals snapshotted at event construction time.
///
/// The screen-reader flag is a heuristic supplied by the host adapter
/// (presence of live-region or labelling markup in the document).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySignals {
    pub high_contrast: bool,
    pub reduced_motion: bool,
    pub screen_reader: bool,
}

/// A single enriched telemetry record.
///
/// Immutable once constructed. Built exclusively by the event factory on
/// [`Telemetry`](crate::Telemetry); enrichment is a snapshot at call time
/// and is never updated retroactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event category (e.g. "navigation", "performance", "error")
    pub category: String,
    /// Action within the category
    pub action: String,
    /// Optional human-readable label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional numeric value (durations and scores are rounded integers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    /// When the event was constructed
    pub timestamp: DateTime<Utc>,
    /// Session this event belongs to
    pub session_id: String,
    /// Authenticated user, if one was associated before construction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Page path at construction time
    pub page: String,
    /// User agent string of the host
    pub user_agent: String,
    /// Viewport dimensions at construction time
    pub viewport: Viewport,
    /// Accessibility signals at construction time
    pub accessibility: AccessibilitySignals,
    /// Content-based hash for backend deduplication (32-char hex)
    ///
    /// Delivery is at-least-once (a failed online send falls back to the
    /// offline queue and is later re-sent in a batch), so the backend needs
    /// a stable key to collapse duplicates.
    pub event_hash: String,
}

impl Event {
    /// Build a fully-enriched event from raw input plus a host snapshot.
    pub(crate) fn build(
        category: &str,
        action: &str,
        label: Option<&str>,
        value: Option<i64>,
        timestamp: DateTime<Utc>,
        session_id: &str,
        user_id: Option<String>,
        snapshot: PageSnapshot,
    ) -> Self {
        let mut event = Event {
            category: category.to_string(),
            action: action.to_string(),
            label: label.map(str::to_string),
            value,
            timestamp,
            session_id: session_id.to_string(),
            user_id,
            page: snapshot.page,
            user_agent: snapshot.user_agent,
            viewport: snapshot.viewport,
            accessibility: snapshot.accessibility,
            event_hash: String::new(),
        };
        event.event_hash = event.content_hash();
        event
    }

    /// Compute the content hash: first 16 bytes of
    /// SHA-256(category:action:timestamp:session_id:label:value), hex-encoded.
    fn content_hash(&self) -> String {
        let hash_input = format!(
            "{}:{}:{}:{}:{}:{}",
            self.category,
            self.action,
            self.timestamp.to_rfc3339(),
            self.session_id,
            self.label.as_deref().unwrap_or(""),
            self.value.map(|v| v.to_string()).unwrap_or_default(),
        );

        let mut hasher = Sha256::new();
        hasher.update(hash_input.as_bytes());
        let result = hasher.finalize();

        hex::encode(&result[..16])
    }
}

// ============================================
// ErrorRecord
// ============================================

/// A normalized uncaught failure.
///
/// Delivered independently of the event log on a dedicated endpoint, with
/// a single send attempt and no offline persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Failure message
    pub message: String,
    /// Stack trace or panic location, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Caller-supplied context (e.g. "panic", a subsystem name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// When the failure was captured
    pub timestamp: DateTime<Utc>,
    /// Page path at capture time
    pub url: String,
    /// User agent string of the host
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PageSnapshot {
        PageSnapshot {
            page: "/dashboard".to_string(),
            user_agent: "pagepulse-test/1.0".to_string(),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            accessibility: AccessibilitySignals::default(),
        }
    }

    fn make_event(value: Option<i64>) -> Event {
        Event::build(
            "navigation",
            "page_view",
            Some("/dashboard"),
            value,
            Utc::now(),
            "session-1",
            None,
            snapshot(),
        )
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = make_event(Some(7));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["sessionId"], "session-1");
        assert_eq!(json["userAgent"], "pagepulse-test/1.0");
        assert_eq!(json["viewport"]["width"], 1280);
        assert_eq!(json["accessibility"]["highContrast"], false);
        assert!(json.get("userId").is_none());
        assert!(json["eventHash"].is_string());
    }

    #[test]
    fn test_event_hash_deterministic() {
        let ts = Utc::now();
        let a = Event::build(
            "test",
            "a",
            None,
            Some(1),
            ts,
            "s",
            None,
            snapshot(),
        );
        let b = Event::build(
            "test",
            "a",
            None,
            Some(1),
            ts,
            "s",
            None,
            snapshot(),
        );
        assert_eq!(a.event_hash, b.event_hash);
        assert_eq!(a.event_hash.len(), 32);
    }

    #[test]
    fn test_event_hash_varies_with_content() {
        let a = make_event(Some(1));
        let b = make_event(Some(2));
        assert_ne!(a.event_hash, b.event_hash);
    }

    #[test]
    fn test_error_record_serializes_camel_case() {
        let record = ErrorRecord {
            message: "boom".to_string(),
            stack: None,
            context: Some("panic".to_string()),
            timestamp: Utc::now(),
            url: "/settings".to_string(),
            user_agent: "pagepulse-test/1.0".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["userAgent"], "pagepulse-test/1.0");
        assert_eq!(json["url"], "/settings");
        assert!(json.get("stack").is_none());
    }
}
