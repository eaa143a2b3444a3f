//! Credential form validation and the toasts it triggers.
//!
//! "Save" reports every problem as its own error toast so they stack;
//! "Submit" collapses any problem into a single error toast.

use crate::error::Result;
use crate::notification::{Category, NotificationId, NotificationScheduler, ScheduleRequest};

const USERNAME_MIN_LEN: usize = 3;
const PASSWORD_MIN_LEN: usize = 6;

/// Lifetime of success toasts
pub const SUCCESS_LIFETIME_MS: i64 = 3000;
/// Lifetime of per-field error toasts raised by "save"
pub const ERROR_LIFETIME_MS: i64 = 5000;
/// Lifetime of the single error toast raised by "submit"
pub const SUBMIT_ERROR_LIFETIME_MS: i64 = 3000;

pub const SAVED_MESSAGE: &str = "Changes saved successfully";
pub const SUBMITTED_MESSAGE: &str = "Form submitted successfully";
pub const SUBMIT_INVALID_MESSAGE: &str = "Please fill in the required details";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Collect every validation problem, username first
    pub fn validate(&self) -> Validation {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("Username is required".to_string());
        } else if username.chars().count() < USERNAME_MIN_LEN {
            errors.push(format!(
                "Username must be at least {} characters",
                USERNAME_MIN_LEN
            ));
        }

        let password = self.password.trim();
        if password.is_empty() {
            errors.push("Password is required".to_string());
        } else if password.chars().count() < PASSWORD_MIN_LEN {
            errors.push(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN_LEN
            ));
        }

        Validation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Inline hint shown under the username field, if any
    pub fn username_hint(&self) -> Option<String> {
        field_hint(&self.username, USERNAME_MIN_LEN)
    }

    /// Inline hint shown under the password field, if any
    pub fn password_hint(&self) -> Option<String> {
        field_hint(&self.password, PASSWORD_MIN_LEN)
    }
}

fn field_hint(value: &str, min_len: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        Some("Required".to_string())
    } else if value.chars().count() < min_len {
        Some(format!("Must be at least {} characters", min_len))
    } else {
        None
    }
}

/// Turns form actions into toasts on a shared scheduler.
#[derive(Debug, Clone)]
pub struct FormToasts {
    scheduler: NotificationScheduler,
}

impl FormToasts {
    pub fn new(scheduler: NotificationScheduler) -> Self {
        Self { scheduler }
    }

    /// One error toast per problem, or a single success toast.
    pub fn save(&self, credentials: &Credentials) -> Result<Vec<NotificationId>> {
        let validation = credentials.validate();
        if !validation.valid {
            tracing::debug!(errors = validation.errors.len(), "Save rejected by validation");
            return validation
                .errors
                .into_iter()
                .map(|message| self.error(message, ERROR_LIFETIME_MS))
                .collect();
        }

        Ok(vec![self.success(SAVED_MESSAGE)?])
    }

    /// Exactly one toast: the generic error or the success message.
    pub fn submit(&self, credentials: &Credentials) -> Result<Vec<NotificationId>> {
        if !credentials.validate().valid {
            tracing::debug!("Submit rejected by validation");
            return Ok(vec![self.error(SUBMIT_INVALID_MESSAGE, SUBMIT_ERROR_LIFETIME_MS)?]);
        }

        Ok(vec![self.success(SUBMITTED_MESSAGE)?])
    }

    fn success(&self, message: &str) -> Result<NotificationId> {
        self.scheduler.schedule(
            ScheduleRequest::new(message)
                .category(Category::success())
                .lifetime_ms(SUCCESS_LIFETIME_MS),
        )
    }

    fn error(&self, message: impl Into<String>, lifetime_ms: i64) -> Result<NotificationId> {
        self.scheduler.schedule(
            ScheduleRequest::new(message)
                .category(Category::error())
                .lifetime_ms(lifetime_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;

    fn form() -> (NotificationScheduler, FormToasts) {
        let scheduler = NotificationScheduler::new(SchedulerConfig::default());
        (scheduler.clone(), FormToasts::new(scheduler))
    }

    #[test]
    fn test_validate_empty_fields() {
        let validation = Credentials::default().validate();
        assert!(!validation.valid);
        assert_eq!(
            validation.errors,
            vec!["Username is required", "Password is required"]
        );
    }

    #[test]
    fn test_validate_short_fields() {
        let validation = Credentials::new(" ab ", "12345").validate();
        assert_eq!(
            validation.errors,
            vec![
                "Username must be at least 3 characters",
                "Password must be at least 6 characters"
            ]
        );
    }

    #[test]
    fn test_validate_ok() {
        let validation = Credentials::new("alice", "hunter22").validate();
        assert!(validation.valid);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn test_hints() {
        let credentials = Credentials::new("", "abc");
        assert_eq!(credentials.username_hint().as_deref(), Some("Required"));
        assert_eq!(
            credentials.password_hint().as_deref(),
            Some("Must be at least 6 characters")
        );
        assert_eq!(Credentials::new("bob", "secret").username_hint(), None);
        assert_eq!(Credentials::new("bob", "secret").password_hint(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_stacks_one_error_per_problem() {
        let (scheduler, form) = form();
        let ids = form.save(&Credentials::new("", "123")).unwrap();

        assert_eq!(ids.len(), 2);
        let snapshot = scheduler.snapshot();
        let messages: Vec<_> = snapshot.iter().map(|item| item.message()).collect();
        assert_eq!(
            messages,
            vec!["Username is required", "Password must be at least 6 characters"]
        );
        assert!(snapshot
            .iter()
            .all(|item| item.category() == &Category::error() && item.lifetime_ms() == 5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_single_error_toast() {
        let (scheduler, form) = form();
        let ids = form.submit(&Credentials::new("", "")).unwrap();

        assert_eq!(ids.len(), 1);
        let item = scheduler.get(ids[0]).unwrap();
        assert_eq!(item.message(), SUBMIT_INVALID_MESSAGE);
        assert_eq!(item.lifetime_ms(), 3000);

        tokio::time::sleep(std::time::Duration::from_millis(3001)).await;
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_form_success_toasts() {
        let (scheduler, form) = form();
        let credentials = Credentials::new("alice", "hunter22");

        let saved = form.save(&credentials).unwrap();
        let submitted = form.submit(&credentials).unwrap();

        assert_eq!(scheduler.get(saved[0]).unwrap().message(), SAVED_MESSAGE);
        assert_eq!(scheduler.get(submitted[0]).unwrap().message(), SUBMITTED_MESSAGE);
        assert!(scheduler
            .snapshot()
            .iter()
            .all(|item| item.category() == &Category::success()));
    }
}
