use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub shutdown: ShutdownSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Category applied when a request does not name one
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Lifetime in milliseconds applied when a request does not name one
    #[serde(default = "default_lifetime_ms")]
    pub default_lifetime_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShutdownSettings {
    /// How long to let visible toasts expire on their own before
    /// cancelling them (0 = cancel immediately)
    #[serde(default)]
    pub drain_timeout_ms: u64,
}

fn default_category() -> String {
    "info".to_string()
}

fn default_lifetime_ms() -> u64 {
    3000 // 3 seconds
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("scheduler.default_category", "info")?
            .set_default("scheduler.default_lifetime_ms", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("metrics.enabled", true)?
            .set_default("shutdown.drain_timeout_ms", 0)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // TOAST_SCHEDULER__DEFAULT_LIFETIME_MS, TOAST_LOGGING__FORMAT, etc.
            .add_source(
                Environment::with_prefix("TOAST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_category: default_category(),
            default_lifetime_ms: default_lifetime_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}
