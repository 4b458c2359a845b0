use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

/// FIFO eviction bound for queued toasts.
const MAX_QUEUED: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    ChatMessage,
}

/// A transient toast. Not persisted; process lifetime only.
#[derive(Clone, Debug)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Order the toast deep-links to, when it concerns a specific order.
    pub order_id: Option<String>,
    pub persistent: bool,
    pub created_at: DateTime<Utc>,
    /// `None` for persistent toasts.
    pub expires_at: Option<DateTime<Utc>>,
}

type Listener = Arc<dyn Fn(&[Notification]) + Send + Sync>;

/// Process-wide toast queue.
///
/// Writers (the session registry, surfaces) only enqueue; the rendering
/// layer subscribes and receives the active snapshot on every change.
/// Expiry is lazy: expired entries are pruned whenever the queue is read
/// or mutated, not by a per-toast timer.
pub struct NotificationQueue {
    ttl: TimeDelta,
    entries: Mutex<Vec<Notification>>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or_else(|_| TimeDelta::seconds(5)),
            entries: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Enqueue a toast and notify subscribers. Returns the assigned id.
    pub fn push(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        order_id: Option<String>,
        persistent: bool,
    ) -> Uuid {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            body: body.into(),
            order_id,
            persistent,
            created_at: now,
            expires_at: (!persistent).then(|| now + self.ttl),
        };
        let id = notification.id;

        {
            let mut entries = self.entries.lock();
            Self::prune(&mut entries, now);
            entries.push(notification);
            if entries.len() > MAX_QUEUED {
                entries.remove(0);
            }
        }

        self.notify_listeners();
        id
    }

    /// Remove a toast by id (user dismissal or deep-link follow).
    pub fn dismiss(&self, id: Uuid) {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|n| n.id != id);
            entries.len() != before
        };
        if removed {
            self.notify_listeners();
        }
    }

    /// Unexpired toasts, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries, Utc::now());
        entries.clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.notify_listeners();
    }

    /// Register a subscriber; it receives the active snapshot on every change.
    pub fn add_listener(&self, listener: impl Fn(&[Notification]) + Send + Sync + 'static) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: u64) {
        self.listeners.lock().remove(&id);
    }

    fn prune(entries: &mut Vec<Notification>, now: DateTime<Utc>) {
        entries.retain(|n| n.expires_at.is_none_or(|at| at > now));
    }

    fn notify_listeners(&self) {
        let snapshot = self.active();
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}
