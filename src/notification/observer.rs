//! Change subscriptions for the live toast stack.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use super::Snapshot;

/// Callback invoked with the new snapshot after every successful mutation
pub type ChangeCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

type Callbacks = DashMap<u64, ChangeCallback>;

/// Registry of change callbacks, keyed by subscription id.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    callbacks: Arc<Callbacks>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, callback: ChangeCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.insert(id, callback);

        tracing::trace!(subscription_id = id, "Change observer registered");

        Subscription {
            id,
            callbacks: Arc::downgrade(&self.callbacks),
            detached: false,
        }
    }

    /// Invoke every callback in registration order.
    ///
    /// The callbacks are collected before any of them runs, so a callback
    /// may subscribe, unsubscribe or call back into the scheduler.
    pub(crate) fn notify(&self, snapshot: &Snapshot) {
        let mut callbacks: Vec<(u64, ChangeCallback)> = self
            .callbacks
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        callbacks.sort_by_key(|(id, _)| *id);

        for (_, callback) in callbacks {
            callback(snapshot);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub(crate) fn clear(&self) {
        self.callbacks.clear();
    }
}

/// Guard for a registered change callback.
///
/// The callback is removed when the guard is dropped, unless it was
/// detached.
#[must_use = "dropping a Subscription immediately unregisters its callback"]
pub struct Subscription {
    id: u64,
    callbacks: Weak<Callbacks>,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the callback now
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the callback registered for the lifetime of the scheduler
    pub fn detach(mut self) {
        self.detached = true;
    }

    fn remove(&mut self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            if callbacks.remove(&self.id).is_some() {
                tracing::trace!(subscription_id = self.id, "Change observer removed");
            }
        }
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish()
    }
}
