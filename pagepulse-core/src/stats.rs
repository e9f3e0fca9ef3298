//! Derived behavioral aggregates
//!
//! Point-in-time metrics computed from the in-memory event log. Derived
//! data is never authoritative: every call recomputes from scratch, nothing
//! is cached or persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Event;

/// Behavioral metrics over the current in-memory event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBehaviorStats {
    /// Count of navigation-category events
    pub page_views: usize,
    /// Elapsed ms since the first recorded event (0 for an empty log)
    pub session_duration_ms: i64,
    /// 100 when at most one page view, else 0
    pub bounce_rate: f64,
    /// Conversion events per page view, as a percentage
    pub conversion_rate: f64,
    /// Error events over all events, as a percentage
    pub error_rate: f64,
    /// 100 minus the share of accessibility events that are issues
    pub accessibility_score: f64,
}

/// Compute aggregates over the event log.
pub(crate) fn compute<'a, I>(events: I, now: DateTime<Utc>) -> UserBehaviorStats
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut total = 0usize;
    let mut page_views = 0usize;
    let mut errors = 0usize;
    let mut conversions = 0usize;
    let mut a11y_total = 0usize;
    let mut a11y_issues = 0usize;
    let mut first_timestamp: Option<DateTime<Utc>> = None;

    for event in events {
        total += 1;
        if first_timestamp.is_none() {
            first_timestamp = Some(event.timestamp);
        }

        match event.category.as_str() {
            "navigation" => page_views += 1,
            "error" => errors += 1,
            "conversion" => conversions += 1,
            "accessibility" => {
                a11y_total += 1;
                if event.action == "issue_detected" {
                    a11y_issues += 1;
                }
            }
            _ => {}
        }
    }

    let error_rate = if total == 0 {
        0.0
    } else {
        errors as f64 / total as f64 * 100.0
    };

    let bounce_rate = if page_views <= 1 { 100.0 } else { 0.0 };

    let conversion_rate = if page_views == 0 {
        0.0
    } else {
        conversions as f64 / page_views as f64 * 100.0
    };

    let accessibility_score = if a11y_total == 0 {
        100.0
    } else {
        (100.0 - a11y_issues as f64 / a11y_total as f64 * 100.0).max(0.0)
    };

    let session_duration_ms = first_timestamp
        .map(|first| (now - first).num_milliseconds())
        .unwrap_or(0);

    UserBehaviorStats {
        page_views,
        session_duration_ms,
        bounce_rate,
        conversion_rate,
        error_rate,
        accessibility_score,
    }
}
