//! Performance signal mapping
//!
//! Bridges host performance signals (Core Web Vitals and document load
//! marks) into the event pipeline so feature code never integrates with the
//! observer machinery directly.
//!
//! All metric values are rounded integers. Layout shift scores are scaled
//! by 1000 before rounding so the small floats survive integer transport.

use serde::{Deserialize, Serialize};

/// A performance signal reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerfEntry {
    /// A paint timing entry (e.g. "first-contentful-paint")
    Paint { name: String, start_time: f64 },
    /// Largest contentful paint
    LargestContentfulPaint { start_time: f64 },
    /// First input, with observer-reported processing start
    FirstInput {
        start_time: f64,
        processing_start: f64,
    },
    /// A single layout shift score
    LayoutShift { value: f64 },
    /// Document parsed (DOMContentLoaded analog), ms since navigation start
    DocumentLoaded { elapsed_ms: f64 },
    /// Full window load, ms since navigation start
    WindowLoaded { elapsed_ms: f64 },
}

/// A mapped performance metric, ready for `track_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfMetric {
    pub action: &'static str,
    pub label: &'static str,
    pub value: i64,
}

/// Map a performance entry to its metric, if it carries one.
///
/// Paint entries other than first-contentful-paint have no mapping and are
/// dropped.
pub fn map_entry(entry: &PerfEntry) -> Option<PerfMetric> {
    match entry {
        PerfEntry::Paint { name, start_time } if name == "first-contentful-paint" => {
            Some(PerfMetric {
                action: "fcp",
                label: "First Contentful Paint",
                value: start_time.round() as i64,
            })
        }
        PerfEntry::Paint { .. } => None,
        PerfEntry::LargestContentfulPaint { start_time } => Some(PerfMetric {
            action: "lcp",
            label: "Largest Contentful Paint",
            value: start_time.round() as i64,
        }),
        PerfEntry::FirstInput {
            start_time,
            processing_start,
        } => Some(PerfMetric {
            action: "fid",
            label: "First Input Delay",
            value: (processing_start - start_time).round() as i64,
        }),
        PerfEntry::LayoutShift { value } => Some(PerfMetric {
            action: "cls",
            label: "Cumulative Layout Shift",
            value: (value * 1000.0).round() as i64,
        }),
        PerfEntry::DocumentLoaded { elapsed_ms } => Some(PerfMetric {
            action: "dom_load",
            label: "DOM Content Loaded",
            value: elapsed_ms.round() as i64,
        }),
        PerfEntry::WindowLoaded { elapsed_ms } => Some(PerfMetric {
            action: "window_load",
            label: "Window Load",
            value: elapsed_ms.round() as i64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_contentful_paint_maps_to_fcp() {
        let metric = map_entry(&PerfEntry::Paint {
            name: "first-contentful-paint".to_string(),
            start_time: 123.4,
        })
        .unwrap();

        assert_eq!(metric.action, "fcp");
        assert_eq!(metric.label, "First Contentful Paint");
        assert_eq!(metric.value, 123);
    }

    #[test]
    fn test_other_paint_entries_are_dropped() {
        let metric = map_entry(&PerfEntry::Paint {
            name: "first-paint".to_string(),
            start_time: 88.0,
        });
        assert!(metric.is_none());
    }

    #[test]
    fn test_first_input_uses_processing_delay() {
        let metric = map_entry(&PerfEntry::FirstInput {
            start_time: 1000.2,
            processing_start: 1012.9,
        })
        .unwrap();

        assert_eq!(metric.action, "fid");
        assert_eq!(metric.value, 13);
    }

    #[test]
    fn test_layout_shift_is_scaled_to_integer() {
        let metric = map_entry(&PerfEntry::LayoutShift { value: 0.0825 }).unwrap();

        assert_eq!(metric.action, "cls");
        assert_eq!(metric.value, 83);
    }

    #[test]
    fn test_load_marks_carry_elapsed_time() {
        let dom = map_entry(&PerfEntry::DocumentLoaded { elapsed_ms: 310.6 }).unwrap();
        assert_eq!(dom.action, "dom_load");
        assert_eq!(dom.value, 311);

        let window = map_entry(&PerfEntry::WindowLoaded { elapsed_ms: 902.3 }).unwrap();
        assert_eq!(window.action, "window_load");
        assert_eq!(window.value, 902);
    }
}
