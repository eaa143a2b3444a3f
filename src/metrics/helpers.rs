//! Metrics helper structs for convenient metric recording

use std::fmt;
use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    TOASTS_LIVE, TOASTS_REJECTED_TOTAL, TOASTS_REMOVED_TOTAL, TOASTS_SCHEDULED_TOTAL,
    TOAST_VISIBLE_SECONDS,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Why a toast left the live stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Explicit `dismiss` call (user close)
    Dismissed,
    /// Lifetime timer fired
    Expired,
    /// Scheduler teardown
    Shutdown,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Dismissed => "dismissed",
            RemovalReason::Expired => "expired",
            RemovalReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Helper struct for recording toast lifecycle metrics
pub struct ToastMetrics;

impl ToastMetrics {
    /// Record a scheduled toast under its category label
    pub fn record_scheduled(category_label: &str) {
        TOASTS_SCHEDULED_TOTAL.with_label_values(&[category_label]).inc();
        TOASTS_LIVE.inc();
    }

    /// Record a removal and how long the toast was visible
    pub fn record_removed(reason: RemovalReason, visible_for: Duration) {
        TOASTS_REMOVED_TOTAL.with_label_values(&[reason.as_str()]).inc();
        TOASTS_LIVE.dec();
        TOAST_VISIBLE_SECONDS.observe(visible_for.as_secs_f64());
    }

    /// Record a rejected schedule request
    pub fn record_rejected() {
        TOASTS_REJECTED_TOTAL.inc();
    }
}
