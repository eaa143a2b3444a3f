use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::Instant;

use crate::error::{Result, SchedulerError};

/// Identifier of a scheduled toast.
///
/// Drawn from a per-scheduler sequence, so an id is never handed out twice
/// by the same scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = std::num::ParseIntError;

    /// Accepts both `toast-7` and `7`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix("toast-").unwrap_or(s);
        digits.parse::<u64>().map(NotificationId)
    }
}

/// Category token attached to a toast.
///
/// The scheduler never inspects it; only the presentation layer maps
/// tokens to visuals. Any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().to_string())
    }

    pub fn info() -> Self {
        Self::new("info")
    }

    pub fn success() -> Self {
        Self::new("success")
    }

    pub fn error() -> Self {
        Self::new("error")
    }

    pub fn warning() -> Self {
        Self::new("warning")
    }

    pub fn neutral() -> Self {
        Self::new("neutral")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bounded label for metrics; unknown tokens collapse into "other"
    pub(crate) fn metric_label(&self) -> &str {
        match self.as_str() {
            "info" | "success" | "error" | "warning" | "neutral" => self.as_str(),
            _ => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Category {
    fn from(token: &str) -> Self {
        Category::new(token)
    }
}

impl From<String> for Category {
    fn from(token: String) -> Self {
        Category(token)
    }
}

/// One toast in the live stack. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationItem {
    id: NotificationId,
    message: String,
    category: Category,
    lifetime_ms: u64,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    created: Instant,
}

impl NotificationItem {
    pub(crate) fn new(
        id: NotificationId,
        message: String,
        category: Category,
        lifetime: Duration,
    ) -> Self {
        Self {
            id,
            message,
            category,
            lifetime_ms: lifetime.as_millis() as u64,
            created_at: Utc::now(),
            created: Instant::now(),
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    pub fn lifetime_ms(&self) -> u64 {
        self.lifetime_ms
    }

    /// Wall-clock time the item entered the live set
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the item entered the live set (monotonic clock)
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    /// Time left before the expiry timer fires, saturating at zero
    pub fn remaining(&self) -> Duration {
        self.lifetime().saturating_sub(self.elapsed())
    }

    /// Fraction of the lifetime already spent, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.lifetime_ms == 0 {
            return 1.0;
        }
        (self.elapsed().as_secs_f64() / self.lifetime().as_secs_f64()).min(1.0)
    }
}

/// Caller input for `NotificationScheduler::schedule`.
///
/// `category` and `lifetime_ms` fall back to the scheduler defaults when
/// omitted. The field aliases accept the camelCase / `type` / `duration`
/// spellings used by browser-side callers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleRequest {
    pub message: String,
    #[serde(default, alias = "type")]
    pub category: Option<Category>,
    #[serde(
        default,
        alias = "lifetimeMs",
        alias = "duration",
        deserialize_with = "deserialize_whole_millis"
    )]
    pub lifetime_ms: Option<i64>,
}

impl ScheduleRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: None,
            lifetime_ms: None,
        }
    }

    /// Set the category
    pub fn category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the lifetime in milliseconds
    pub fn lifetime_ms(mut self, lifetime_ms: i64) -> Self {
        self.lifetime_ms = Some(lifetime_ms);
        self
    }

    /// Set the lifetime from a duration
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime_ms = Some(i64::try_from(lifetime.as_millis()).unwrap_or(i64::MAX));
        self
    }

    /// Parse a request from loosely typed JSON input.
    ///
    /// Malformed input, including fractional lifetimes, is reported as
    /// `InvalidRequest`.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| SchedulerError::invalid(e.to_string()))
    }

    /// Validate against the scheduler defaults, producing the pieces of a
    /// new item.
    pub(crate) fn resolve(
        self,
        default_category: &Category,
        default_lifetime: Duration,
    ) -> Result<(String, Category, Duration)> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(SchedulerError::invalid("message must not be empty"));
        }

        let lifetime = match self.lifetime_ms {
            None => default_lifetime,
            Some(ms) if ms < 0 => {
                return Err(SchedulerError::invalid(format!(
                    "lifetime_ms must be non-negative, got {}",
                    ms
                )));
            }
            Some(ms) => Duration::from_millis(ms as u64),
        };

        let category = match self.category {
            Some(category) if !category.as_str().trim().is_empty() => category,
            _ => default_category.clone(),
        };

        Ok((message.to_string(), category, lifetime))
    }
}

/// Accepts integers and integral floats (`3000`, `3000.0`); rejects
/// fractional values and values outside the `i64` range.
fn deserialize_whole_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    let Some(number) = value else {
        return Ok(None);
    };

    if let Some(ms) = number.as_i64() {
        return Ok(Some(ms));
    }
    let out_of_range = || {
        D::Error::custom(format!(
            "lifetime_ms is out of range, got {} (max {})",
            number,
            i64::MAX
        ))
    };
    if number.is_u64() {
        return Err(out_of_range());
    }
    match number.as_f64() {
        Some(ms) if ms.fract() != 0.0 => Err(D::Error::custom(format!(
            "lifetime_ms must be a whole number of milliseconds, got {}",
            number
        ))),
        Some(ms) if ms >= i64::MIN as f64 && ms < i64::MAX as f64 => Ok(Some(ms as i64)),
        _ => Err(out_of_range()),
    }
}

/// Immutable, insertion-ordered view of the live set.
///
/// Cloning is cheap and iteration can be restarted freely. `revision`
/// increases with every successful mutation of the scheduler.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    revision: u64,
    items: Arc<[Arc<NotificationItem>]>,
}

impl Snapshot {
    pub(crate) fn new(revision: u64, items: Arc<[Arc<NotificationItem>]>) -> Self {
        Self { revision, items }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items oldest first
    pub fn iter(&self) -> impl Iterator<Item = &NotificationItem> + '_ {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn get(&self, id: NotificationId) -> Option<&NotificationItem> {
        self.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<NotificationId> {
        self.iter().map(NotificationItem::id).collect()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a NotificationItem;
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, Arc<NotificationItem>>,
        fn(&'a Arc<NotificationItem>) -> &'a NotificationItem,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter().map(unwrap_item as fn(&'a Arc<NotificationItem>) -> &'a NotificationItem)
    }
}

fn unwrap_item(item: &Arc<NotificationItem>) -> &NotificationItem {
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(request: ScheduleRequest) -> Result<(String, Category, Duration)> {
        request.resolve(&Category::info(), Duration::from_millis(3000))
    }

    #[test]
    fn test_notification_id_display_and_parse() {
        let id = NotificationId::from_raw(42);
        assert_eq!(id.to_string(), "toast-42");
        assert_eq!("toast-42".parse::<NotificationId>().unwrap(), id);
        assert_eq!(" 42 ".parse::<NotificationId>().unwrap(), id);
        assert!("toast-".parse::<NotificationId>().is_err());
    }

    #[test]
    fn test_request_defaults_applied() {
        let (message, category, lifetime) = resolve(ScheduleRequest::new("  Saved  ")).unwrap();
        assert_eq!(message, "Saved");
        assert_eq!(category, Category::info());
        assert_eq!(lifetime, Duration::from_millis(3000));
    }

    #[test]
    fn test_request_rejects_blank_message() {
        let err = resolve(ScheduleRequest::new(" \t\n")).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_negative_lifetime() {
        let err = resolve(ScheduleRequest::new("x").lifetime_ms(-1)).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::invalid("lifetime_ms must be non-negative, got -1")
        );
    }

    #[test]
    fn test_request_zero_lifetime_allowed() {
        let (_, _, lifetime) = resolve(ScheduleRequest::new("x").lifetime_ms(0)).unwrap();
        assert_eq!(lifetime, Duration::ZERO);
    }

    #[test]
    fn test_unknown_category_passes_through() {
        let (_, category, _) = resolve(ScheduleRequest::new("x").category("Celebration")).unwrap();
        assert_eq!(category.as_str(), "Celebration");
        assert_eq!(category.metric_label(), "other");
    }

    #[test]
    fn test_blank_category_uses_default() {
        let (_, category, _) = resolve(ScheduleRequest::new("x").category("  ")).unwrap();
        assert_eq!(category, Category::info());
    }

    #[test]
    fn test_from_json_aliases() {
        let request =
            ScheduleRequest::from_json(r#"{"message":"Hi","type":"success","duration":2000}"#)
                .unwrap();
        assert_eq!(request.category, Some(Category::success()));
        assert_eq!(request.lifetime_ms, Some(2000));

        let request = ScheduleRequest::from_json(r#"{"message":"Hi","lifetimeMs":5000.0}"#).unwrap();
        assert_eq!(request.lifetime_ms, Some(5000));
        assert_eq!(request.category, None);
    }

    #[test]
    fn test_from_json_rejects_fractional_lifetime() {
        let err = ScheduleRequest::from_json(r#"{"message":"Hi","lifetime_ms":1.5}"#).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(msg) if msg.contains("whole number")));
    }

    #[test]
    fn test_from_json_rejects_out_of_range_lifetime() {
        let err =
            ScheduleRequest::from_json(r#"{"message":"Hi","lifetime_ms":18446744073709551615}"#)
                .unwrap_err();
        assert!(matches!(&err, SchedulerError::InvalidRequest(msg) if msg.contains("out of range")));
        assert!(!err.to_string().contains("whole number"));

        let err = ScheduleRequest::from_json(r#"{"message":"Hi","lifetime_ms":1e30}"#).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(msg) if msg.contains("out of range")));
    }

    #[test]
    fn test_from_json_rejects_missing_message() {
        let err = ScheduleRequest::from_json(r#"{"lifetime_ms":100}"#).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_progress_tracks_clock() {
        let item = NotificationItem::new(
            NotificationId::from_raw(1),
            "x".to_string(),
            Category::info(),
            Duration::from_millis(1000),
        );
        assert_eq!(item.progress(), 0.0);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(item.elapsed(), Duration::from_millis(250));
        assert_eq!(item.remaining(), Duration::from_millis(750));
        assert!((item.progress() - 0.25).abs() < f64::EPSILON);

        tokio::time::advance(Duration::from_millis(5000)).await;
        assert_eq!(item.remaining(), Duration::ZERO);
        assert_eq!(item.progress(), 1.0);
    }

    #[test]
    fn test_item_serializes_without_monotonic_clock() {
        let item = NotificationItem::new(
            NotificationId::from_raw(3),
            "Saved".to_string(),
            Category::success(),
            Duration::from_millis(3000),
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["category"], "success");
        assert_eq!(value["lifetime_ms"], 3000);
        assert!(value.get("created").is_none());
    }
}
