//! Prometheus metrics for the toast scheduler.
//!
//! - Lifecycle counters (scheduled, removed by reason, rejected)
//! - Live stack size
//! - Time each toast spent on screen

mod helpers;

pub use helpers::{encode_metrics, RemovalReason, ToastMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "toast";

lazy_static! {
    /// Total toasts scheduled, by category
    pub static ref TOASTS_SCHEDULED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_scheduled_total", METRIC_PREFIX),
        "Total toasts scheduled",
        &["category"]
    ).unwrap();

    /// Total toasts removed from the live stack, by reason
    pub static ref TOASTS_REMOVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_removed_total", METRIC_PREFIX),
        "Total toasts removed from the live stack",
        &["reason"]
    ).unwrap();

    /// Total schedule requests rejected as invalid
    pub static ref TOASTS_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_rejected_total", METRIC_PREFIX),
        "Total schedule requests rejected"
    ).unwrap();

    /// Toasts currently visible
    pub static ref TOASTS_LIVE: IntGauge = register_int_gauge!(
        format!("{}_live", METRIC_PREFIX),
        "Number of toasts currently in the live stack"
    ).unwrap();

    /// Time a toast spent in the live stack
    pub static ref TOAST_VISIBLE_SECONDS: Histogram = register_histogram!(
        format!("{}_visible_seconds", METRIC_PREFIX),
        "Time a toast spent in the live stack in seconds",
        vec![0.05, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 30.0]
    ).unwrap();
}
