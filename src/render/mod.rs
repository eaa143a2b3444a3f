//! Presentation of individual toast cards.
//!
//! This is the only place category tokens are interpreted. Unknown tokens
//! render like `info`, so new categories never need scheduler changes.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::notification::{
    Category, NotificationId, NotificationItem, NotificationScheduler, Snapshot,
};

/// How assistive technology should announce the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Interrupts: errors and warnings
    Alert,
    /// Polite announcement
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    Blue,
    Green,
    Red,
    Amber,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub role: Role,
    pub icon: &'static str,
    pub accent: Accent,
}

const INFO: Presentation = Presentation {
    role: Role::Status,
    icon: "ℹ",
    accent: Accent::Blue,
};

impl Presentation {
    /// Map a category token; matching ignores ASCII case
    pub fn for_category(category: &Category) -> Self {
        match category.as_str().to_ascii_lowercase().as_str() {
            "success" => Presentation {
                role: Role::Status,
                icon: "✓",
                accent: Accent::Green,
            },
            "error" => Presentation {
                role: Role::Alert,
                icon: "!",
                accent: Accent::Red,
            },
            "warning" => Presentation {
                role: Role::Alert,
                icon: "⚠",
                accent: Accent::Amber,
            },
            "neutral" => Presentation {
                role: Role::Status,
                icon: "•",
                accent: Accent::Gray,
            },
            _ => INFO,
        }
    }
}

/// Everything a card needs to draw itself at one instant
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub id: NotificationId,
    pub message: String,
    pub category: Category,
    pub presentation: Presentation,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    /// Share of the lifetime already spent, `0.0..=1.0`
    pub progress: f64,
}

impl CardView {
    pub fn from_item(item: &NotificationItem) -> Self {
        Self {
            id: item.id(),
            message: item.message().to_string(),
            category: item.category().clone(),
            presentation: Presentation::for_category(item.category()),
            elapsed_ms: millis(item.elapsed()),
            remaining_ms: millis(item.remaining()),
            progress: item.progress(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

/// Views for a whole stack, oldest first
pub fn cards(snapshot: &Snapshot) -> Vec<CardView> {
    snapshot.iter().map(CardView::from_item).collect()
}

/// One-shot manual close for a rendered card.
///
/// `close` consumes the handle, so a card can dismiss its toast at most
/// once. Dropping the handle without closing does nothing: expiry stays
/// with the scheduler.
#[derive(Debug)]
pub struct CloseHandle {
    scheduler: NotificationScheduler,
    id: NotificationId,
}

impl CloseHandle {
    pub fn new(scheduler: &NotificationScheduler, id: NotificationId) -> Self {
        Self {
            scheduler: scheduler.clone(),
            id,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// Dismiss the toast; `false` if it had already left the stack
    pub fn close(self) -> bool {
        self.scheduler.dismiss(self.id)
    }
}

/// Plain-text rendering of the stack, newest nearest the anchor (bottom).
pub fn render_stack(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return "(no notifications)\n".to_string();
    }

    let mut out = String::new();
    for card in cards(snapshot) {
        let _ = writeln!(
            out,
            "[{}] {:<8} {} {}  ({}ms left)",
            card.id,
            card.category,
            card.presentation.icon,
            card.message,
            card.remaining_ms
        );
    }
    out
}
