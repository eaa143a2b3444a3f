use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::metrics::{RemovalReason, ToastMetrics};

use super::observer::{ObserverRegistry, Subscription};
use super::{Category, NotificationId, NotificationItem, ScheduleRequest, Snapshot};

/// Lifecycle counters (atomic for cheap reads from any thread)
#[derive(Debug, Default)]
struct SchedulerCounters {
    scheduled: AtomicU64,
    dismissed: AtomicU64,
    expired: AtomicU64,
    rejected: AtomicU64,
    cleared: AtomicU64,
}

/// Point-in-time view of the scheduler counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub dismissed: u64,
    pub expired: u64,
    pub rejected: u64,
    pub cleared_on_shutdown: u64,
    pub live: usize,
    pub pending_timers: usize,
}

/// Outcome of `NotificationScheduler::shutdown`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Expiry timers that were still armed
    pub cancelled_timers: usize,
    /// Toasts removed from the live set
    pub cleared_items: usize,
    /// The scheduler had already been shut down; nothing was done
    pub already_shut_down: bool,
}

/// Live set plus the expiry timer of every item in it.
///
/// Both live behind one lock so an item and its timer always leave
/// together.
#[derive(Default)]
struct LiveState {
    items: Vec<Arc<NotificationItem>>,
    timers: HashMap<NotificationId, AbortHandle>,
    revision: u64,
    closed: bool,
}

impl LiveState {
    fn view(&self) -> Snapshot {
        Snapshot::new(self.revision, self.items.iter().cloned().collect())
    }

    /// Bump the revision and capture the result of a mutation
    fn commit(&mut self) -> Snapshot {
        self.revision += 1;
        self.view()
    }
}

/// Snapshots committed but not yet delivered to every observer
#[derive(Default)]
struct PublishQueue {
    pending: VecDeque<Snapshot>,
    delivering: bool,
}

/// Clears the delivering flag, also when a callback panics
struct Delivering<'a>(&'a RefCell<PublishQueue>);

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().delivering = false;
    }
}

struct SchedulerInner {
    default_category: Category,
    default_lifetime: Duration,
    runtime: Handle,
    next_id: AtomicU64,
    state: Mutex<LiveState>,
    /// Held from mutation until every observer has seen the result.
    /// Re-entrant for callbacks that call back into the scheduler; their
    /// snapshots wait in the queue behind the one being delivered.
    publish: ReentrantMutex<RefCell<PublishQueue>>,
    observers: ObserverRegistry,
    watch_tx: watch::Sender<Snapshot>,
    counters: SchedulerCounters,
}

impl SchedulerInner {
    /// Single removal path shared by `dismiss`, the expiry timer and
    /// nothing else. Whoever finds the item in the live set removes it;
    /// everyone after that sees it absent.
    fn remove(&self, id: NotificationId, reason: RemovalReason) -> bool {
        let _publish = self.publish.lock();

        let (item, snapshot) = {
            let mut state = self.state.lock();
            let Some(index) = state.items.iter().position(|item| item.id() == id) else {
                return false;
            };
            let item = state.items.remove(index);
            if let Some(timer) = state.timers.remove(&id) {
                // An expiring timer is the task running this code
                if reason != RemovalReason::Expired {
                    timer.abort();
                }
            }
            (item, state.commit())
        };

        match reason {
            RemovalReason::Dismissed => self.counters.dismissed.fetch_add(1, Ordering::Relaxed),
            RemovalReason::Expired => self.counters.expired.fetch_add(1, Ordering::Relaxed),
            RemovalReason::Shutdown => self.counters.cleared.fetch_add(1, Ordering::Relaxed),
        };
        let visible_for = item.elapsed();
        ToastMetrics::record_removed(reason, visible_for);

        tracing::debug!(
            notification_id = %id,
            reason = %reason,
            visible_ms = visible_for.as_millis() as u64,
            live = snapshot.len(),
            "Toast removed"
        );

        self.publish(Some(snapshot));
        true
    }

    /// Deliver a committed snapshot to the watch channel and every observer.
    ///
    /// A mutation made from inside a callback only queues its snapshot.
    /// The outermost call drains the queue in revision order, each snapshot
    /// reaching every observer before the next one goes out. Observers are
    /// released once a shut-down scheduler has nothing left to deliver.
    fn publish(&self, snapshot: Option<Snapshot>) {
        let publish = self.publish.lock();
        {
            let mut queue = publish.borrow_mut();
            queue.pending.extend(snapshot);
            if queue.delivering {
                return;
            }
            queue.delivering = true;
        }
        let _delivering = Delivering(&*publish);

        loop {
            let next = publish.borrow_mut().pending.pop_front();
            let Some(snapshot) = next else {
                break;
            };
            self.watch_tx.send_replace(snapshot.clone());
            self.observers.notify(&snapshot);
        }

        if self.state.lock().closed {
            self.observers.clear();
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        for item in state.items.drain(..) {
            ToastMetrics::record_removed(RemovalReason::Shutdown, item.elapsed());
        }
    }
}

/// Owns the live toast stack and the expiry timer of every toast in it.
///
/// Cloning yields another handle to the same scheduler. Timers hold only
/// a weak reference, so dropping the last handle tears the scheduler down
/// and cancels every outstanding timer.
#[derive(Clone)]
pub struct NotificationScheduler {
    inner: Arc<SchedulerInner>,
}

impl NotificationScheduler {
    /// Create a scheduler whose timers run on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime, like `tokio::spawn`.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_runtime(config, Handle::current())
    }

    /// Create a scheduler whose timers run on the given runtime
    pub fn with_runtime(config: SchedulerConfig, runtime: Handle) -> Self {
        let (watch_tx, _) = watch::channel(Snapshot::default());

        tracing::debug!(
            default_category = %config.default_category,
            default_lifetime_ms = config.default_lifetime_ms,
            "Notification scheduler created"
        );

        Self {
            inner: Arc::new(SchedulerInner {
                default_category: Category::new(&config.default_category),
                default_lifetime: Duration::from_millis(config.default_lifetime_ms),
                runtime,
                next_id: AtomicU64::new(1),
                state: Mutex::new(LiveState::default()),
                publish: ReentrantMutex::new(RefCell::new(PublishQueue::default())),
                observers: ObserverRegistry::new(),
                watch_tx,
                counters: SchedulerCounters::default(),
            }),
        }
    }

    /// Add a toast to the tail of the live set and arm its expiry timer.
    ///
    /// Observers see the new snapshot before this returns, unless it is
    /// called from inside a change callback: then delivery follows the
    /// snapshot currently going out. An invalid request leaves no trace:
    /// no item, no timer, no notification.
    pub fn schedule(&self, request: ScheduleRequest) -> Result<NotificationId> {
        let inner = &self.inner;

        let (message, category, lifetime) =
            match request.resolve(&inner.default_category, inner.default_lifetime) {
                Ok(parts) => parts,
                Err(e) => {
                    inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    ToastMetrics::record_rejected();
                    tracing::warn!(error = %e, "Rejected toast request");
                    return Err(e);
                }
            };

        let _publish = inner.publish.lock();

        let (id, snapshot) = {
            let mut state = inner.state.lock();
            if state.closed {
                return Err(SchedulerError::ShutDown);
            }

            let id = NotificationId::from_raw(inner.next_id.fetch_add(1, Ordering::Relaxed));
            let item = NotificationItem::new(id, message, category, lifetime);
            ToastMetrics::record_scheduled(item.category().metric_label());

            tracing::debug!(
                notification_id = %id,
                category = %item.category(),
                lifetime_ms = item.lifetime_ms(),
                "Toast scheduled"
            );

            state.items.push(Arc::new(item));
            let timer = arm_expiry(inner, id, lifetime);
            state.timers.insert(id, timer);
            (id, state.commit())
        };

        inner.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        inner.publish(Some(snapshot));
        Ok(id)
    }

    /// Remove a toast and cancel its timer.
    ///
    /// Returns `false` when the id is not live (already dismissed, expired,
    /// never issued, or the scheduler was shut down).
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let removed = self.inner.remove(id, RemovalReason::Dismissed);
        if !removed {
            tracing::trace!(notification_id = %id, "Dismiss for toast that is not live");
        }
        removed
    }

    /// Current live set, oldest first
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.lock().view()
    }

    /// Register a callback invoked with every new snapshot.
    ///
    /// Callbacks run synchronously on the thread that performed the
    /// mutation, after the scheduler's internal lock is released; they may
    /// call back into the scheduler. Every callback sees every snapshot
    /// exactly once and in revision order, so the last one seen is always
    /// the live set.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.observers.register(Arc::new(callback))
    }

    /// Receiver that always holds the most recently published snapshot
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.inner.watch_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NotificationId) -> Option<Arc<NotificationItem>> {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Number of armed expiry timers
    pub fn pending_timers(&self) -> usize {
        self.inner.state.lock().timers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.inner.counters;
        let (live, pending_timers) = {
            let state = self.inner.state.lock();
            (state.items.len(), state.timers.len())
        };

        SchedulerStats {
            scheduled: counters.scheduled.load(Ordering::Relaxed),
            dismissed: counters.dismissed.load(Ordering::Relaxed),
            expired: counters.expired.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            cleared_on_shutdown: counters.cleared.load(Ordering::Relaxed),
            live,
            pending_timers,
        }
    }

    /// Cancel every timer, clear the live set and refuse further scheduling.
    ///
    /// Observers get one final empty snapshot if anything was cleared and
    /// are then released. Calling this again is a no-op.
    #[tracing::instrument(name = "scheduler_shutdown", skip(self))]
    pub fn shutdown(&self) -> ShutdownReport {
        let inner = &self.inner;
        let _publish = inner.publish.lock();

        let (cancelled_timers, cleared, snapshot) = {
            let mut state = inner.state.lock();
            if state.closed {
                return ShutdownReport {
                    already_shut_down: true,
                    ..Default::default()
                };
            }
            state.closed = true;

            let cancelled_timers = state.timers.len();
            for (_, timer) in state.timers.drain() {
                timer.abort();
            }
            let cleared: Vec<_> = state.items.drain(..).collect();
            let snapshot = if cleared.is_empty() {
                None
            } else {
                Some(state.commit())
            };
            (cancelled_timers, cleared, snapshot)
        };

        for item in &cleared {
            ToastMetrics::record_removed(RemovalReason::Shutdown, item.elapsed());
        }
        inner
            .counters
            .cleared
            .fetch_add(cleared.len() as u64, Ordering::Relaxed);

        inner.publish(snapshot);

        tracing::info!(
            cancelled_timers = cancelled_timers,
            cleared_items = cleared.len(),
            "Notification scheduler shut down"
        );

        ShutdownReport {
            cancelled_timers,
            cleared_items: cleared.len(),
            already_shut_down: false,
        }
    }

    #[cfg(test)]
    fn expire_now(&self, id: NotificationId) -> bool {
        self.inner.remove(id, RemovalReason::Expired)
    }
}

impl std::fmt::Debug for NotificationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("NotificationScheduler")
            .field("live", &state.items.len())
            .field("pending_timers", &state.timers.len())
            .field("revision", &state.revision)
            .field("closed", &state.closed)
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

/// Spawn the one-shot expiry timer for `id`.
///
/// The task holds only a weak reference: a torn-down scheduler is never
/// kept alive or touched by a late timer.
fn arm_expiry(inner: &Arc<SchedulerInner>, id: NotificationId, lifetime: Duration) -> AbortHandle {
    let scheduler: Weak<SchedulerInner> = Arc::downgrade(inner);

    inner
        .runtime
        .spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Some(inner) = scheduler.upgrade() {
                inner.remove(id, RemovalReason::Expired);
            }
        })
        .abort_handle()
}
