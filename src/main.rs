use std::io::Write;

use anyhow::Result;
use tokio::io::BufReader;

use toast_scheduler::config::Settings;
use toast_scheduler::console::{Console, HELP};
use toast_scheduler::error::AppError;
use toast_scheduler::notification::NotificationScheduler;
use toast_scheduler::render::render_stack;
use toast_scheduler::shutdown::{wait_for_signal, GracefulShutdown, ShutdownConfig};
use toast_scheduler::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new().map_err(AppError::from)?;

    // Initialize tracing
    init_tracing(&settings.logging).map_err(AppError::from)?;
    tracing::info!(
        default_category = %settings.scheduler.default_category,
        default_lifetime_ms = settings.scheduler.default_lifetime_ms,
        "Configuration loaded"
    );

    let scheduler = NotificationScheduler::new(settings.scheduler.clone());

    // Redraw the stack on every change
    scheduler
        .on_change(|snapshot| {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(
                stdout,
                "--- notifications (rev {}) ---\n{}",
                snapshot.revision(),
                render_stack(snapshot)
            );
            let _ = stdout.flush();
        })
        .detach();

    print!("{}", HELP);

    let console = Console::new(scheduler.clone(), settings.metrics.enabled);
    let reason = tokio::select! {
        result = console.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => {
            result.map_err(AppError::from)?;
            "console closed"
        }
        signal = wait_for_signal() => signal,
    };

    let shutdown =
        GracefulShutdown::with_config(scheduler, ShutdownConfig::from(&settings.shutdown));
    shutdown.execute(reason).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
