//! Graceful shutdown handling for the toast scheduler.
//!
//! 1. Optionally let the visible toasts run out their lifetimes
//! 2. Cancel every remaining timer and clear the stack
//! 3. Report what was cut short

use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;

use crate::config::ShutdownSettings;
use crate::notification::{NotificationScheduler, ShutdownReport};

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time to wait for visible toasts to expire on their own (default: none)
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::ZERO,
        }
    }
}

impl From<&ShutdownSettings> for ShutdownConfig {
    fn from(settings: &ShutdownSettings) -> Self {
        Self {
            drain_timeout: Duration::from_millis(settings.drain_timeout_ms),
        }
    }
}

/// Tears down a scheduler at process exit
pub struct GracefulShutdown {
    scheduler: NotificationScheduler,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    pub fn new(scheduler: NotificationScheduler) -> Self {
        Self {
            scheduler,
            config: ShutdownConfig::default(),
        }
    }

    pub fn with_config(scheduler: NotificationScheduler, config: ShutdownConfig) -> Self {
        Self { scheduler, config }
    }

    /// Execute the shutdown sequence
    #[tracing::instrument(
        name = "graceful_shutdown",
        skip(self),
        fields(live = self.scheduler.len())
    )]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = tokio::time::Instant::now();

        tracing::info!(reason = %reason, "Starting graceful shutdown");
        let drained = self.drain().await;

        let report = self.scheduler.shutdown();
        let duration = start.elapsed();

        tracing::info!(
            drained = drained,
            cancelled_timers = report.cancelled_timers,
            cleared_items = report.cleared_items,
            duration_ms = duration.as_millis() as u64,
            "Graceful shutdown completed"
        );

        ShutdownResult {
            drained,
            report,
            duration,
        }
    }

    /// Wait for the live stack to empty by itself
    async fn drain(&self) -> bool {
        if self.scheduler.is_empty() {
            return true;
        }
        if self.config.drain_timeout.is_zero() {
            return false;
        }

        tracing::info!(
            live = self.scheduler.len(),
            timeout_ms = self.config.drain_timeout.as_millis() as u64,
            "Waiting for visible toasts to expire"
        );

        let mut rx = self.scheduler.watch();
        let scheduler = &self.scheduler;
        let wait = async {
            while !scheduler.is_empty() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };

        match timeout(self.config.drain_timeout, wait).await {
            Ok(()) => scheduler.is_empty(),
            Err(_) => {
                tracing::warn!(
                    remaining = scheduler.len(),
                    "Drain timeout, cancelling remaining toasts"
                );
                false
            }
        }
    }
}

/// Result of a graceful shutdown
#[derive(Debug, Default)]
pub struct ShutdownResult {
    /// The stack emptied before teardown
    pub drained: bool,
    pub report: ShutdownReport,
    pub duration: Duration,
}

/// Resolve on Ctrl+C or, on unix, SIGTERM.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            "ctrl-c"
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
            "sigterm"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::notification::ScheduleRequest;

    fn create_scheduler() -> NotificationScheduler {
        NotificationScheduler::new(SchedulerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_empty_scheduler() {
        let scheduler = create_scheduler();
        let shutdown = GracefulShutdown::new(scheduler.clone());

        let result = shutdown.execute("test shutdown").await;

        assert!(result.drained);
        assert_eq!(result.report.cleared_items, 0);
        assert!(scheduler.is_shut_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_drain_cancels() {
        let scheduler = create_scheduler();
        scheduler.schedule(ScheduleRequest::new("a")).unwrap();
        scheduler.schedule(ScheduleRequest::new("b")).unwrap();

        let result = GracefulShutdown::new(scheduler.clone())
            .execute("test")
            .await;

        assert!(!result.drained);
        assert_eq!(result.report.cancelled_timers, 2);
        assert_eq!(result.report.cleared_items, 2);
        assert_eq!(result.duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_short_toasts() {
        let scheduler = create_scheduler();
        scheduler
            .schedule(ScheduleRequest::new("quick").lifetime_ms(200))
            .unwrap();

        let config = ShutdownConfig {
            drain_timeout: Duration::from_secs(1),
        };
        let result = GracefulShutdown::with_config(scheduler.clone(), config)
            .execute("test")
            .await;

        assert!(result.drained);
        assert_eq!(result.report.cleared_items, 0);
        assert!(result.duration >= Duration::from_millis(200));
        assert!(result.duration < Duration::from_secs(1));
        assert_eq!(scheduler.stats().expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drain_timeout() {
        let scheduler = create_scheduler();
        scheduler
            .schedule(ScheduleRequest::new("slow").lifetime_ms(10_000))
            .unwrap();

        let config = ShutdownConfig {
            drain_timeout: Duration::from_millis(500),
        };
        let result = GracefulShutdown::with_config(scheduler.clone(), config)
            .execute("test")
            .await;

        assert!(!result.drained);
        assert_eq!(result.report.cleared_items, 1);
        assert!(result.duration >= Duration::from_millis(500));
        assert!(result.duration < Duration::from_secs(10));
    }

    #[test]
    fn test_shutdown_config_defaults() {
        assert_eq!(ShutdownConfig::default().drain_timeout, Duration::ZERO);
    }
}
