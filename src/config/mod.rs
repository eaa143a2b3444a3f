mod settings;

pub use settings::{LoggingConfig, MetricsConfig, SchedulerConfig, Settings, ShutdownSettings};
