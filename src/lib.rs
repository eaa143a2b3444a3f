// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer (toast lifecycle)
pub mod notification;

// Collaborators around the scheduler
pub mod forms;
pub mod presets;
pub mod render;

// Application layer
pub mod console;
pub mod shutdown;
