use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors raised by the notification scheduler.
///
/// `dismiss` never produces one of these: unknown or stale ids are an
/// expected outcome of the timer/manual race and are reported as `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Scheduler has been shut down")]
    ShutDown,
}

impl SchedulerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SchedulerError::InvalidRequest(message.into())
    }

    /// Stable code used in logs and console output
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::InvalidRequest(_) => "INVALID_REQUEST",
            SchedulerError::ShutDown => "SHUT_DOWN",
        }
    }
}

/// Application-level errors for the console binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchedulerError::invalid("x").code(), "INVALID_REQUEST");
        assert_eq!(SchedulerError::ShutDown.code(), "SHUT_DOWN");
    }

    #[test]
    fn test_app_error_wraps_scheduler_error() {
        let err: AppError = SchedulerError::invalid("message must not be empty").into();
        assert_eq!(err.to_string(), "Invalid request: message must not be empty");
    }
}
