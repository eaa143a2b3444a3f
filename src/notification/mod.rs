//! Toast lifecycle: identity, per-item expiry timers, ordered stacking and
//! removal.
//!
//! - `NotificationItem`: immutable record of one toast
//! - `NotificationScheduler`: owns the live set and the timer of every item
//!   in it, and publishes a `Snapshot` after each change
//!
//! Every removal, manual or timed, goes through the same path and happens
//! at most once per id.

mod observer;
mod scheduler;
mod types;

pub use observer::{ChangeCallback, Subscription};
pub use scheduler::{NotificationScheduler, SchedulerStats, ShutdownReport};
pub use types::{Category, NotificationId, NotificationItem, ScheduleRequest, Snapshot};
