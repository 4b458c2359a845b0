use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::ChatApi;
use crate::auth::AuthState;

/// Cached unread state for one order.
#[derive(Clone, Debug, PartialEq)]
pub struct UnreadRecord {
    pub order_id: String,
    pub count: u32,
    pub thread_id: String,
    pub last_message: Option<String>,
}

/// Full cache snapshot handed to listeners on every change.
pub type UnreadSnapshot = HashMap<String, UnreadRecord>;

type Listener = Arc<dyn Fn(&UnreadSnapshot) + Send + Sync>;

/// Per-order unread-count cache, maintained independently of any open chat
/// surface.
///
/// The cache holds the server's authoritative counts with one deliberate
/// exception: a successful mark-as-read deletes the order's entry locally
/// before the next fetch confirms it, so badges clear without waiting out
/// the refresh interval.
pub struct UnreadStore {
    api: Arc<dyn ChatApi>,
    auth: Arc<AuthState>,
    cache: Mutex<UnreadSnapshot>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
}

impl UnreadStore {
    pub fn new(api: Arc<dyn ChatApi>, auth: Arc<AuthState>) -> Self {
        Self {
            api,
            auth,
            cache: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Fetch the aggregate unread map and replace the cache atomically.
    ///
    /// No authenticated user means nothing to fetch. Transport failure
    /// leaves the existing cache untouched and does not notify.
    pub async fn refresh(&self) {
        if !self.auth.is_authenticated() {
            return;
        }

        match self.api.fetch_unread_counts().await {
            Ok(counts) => {
                let snapshot: UnreadSnapshot = counts
                    .into_iter()
                    .map(|(order_id, entry)| {
                        let record = UnreadRecord {
                            order_id: order_id.clone(),
                            count: entry.count,
                            thread_id: entry.thread_id,
                            last_message: entry.last_message,
                        };
                        (order_id, record)
                    })
                    .collect();
                debug!(orders = snapshot.len(), "Unread counts refreshed");
                *self.cache.lock() = snapshot;
                self.notify_listeners();
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch unread counts, keeping cached values");
            }
        }
    }

    /// Persist read state server-side, then optimistically drop the order's
    /// entry locally. Returns whether the optimistic clear happened.
    pub async fn mark_as_read(&self, thread_id: &str, order_id: &str) -> bool {
        match self.api.mark_thread_read(thread_id).await {
            Ok(()) => {
                let removed = self.cache.lock().remove(order_id).is_some();
                debug!(thread_id = %thread_id, order_id = %order_id, removed, "Thread marked read");
                self.notify_listeners();
                true
            }
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Failed to mark thread read");
                false
            }
        }
    }

    /// Synchronous lookup; unknown orders read as zero.
    pub fn unread_count(&self, order_id: &str) -> u32 {
        self.cache.lock().get(order_id).map_or(0, |r| r.count)
    }

    /// Sum over all orders, for an app-level badge.
    pub fn total_unread(&self) -> u32 {
        self.cache.lock().values().map(|r| r.count).sum()
    }

    pub fn record(&self, order_id: &str) -> Option<UnreadRecord> {
        self.cache.lock().get(order_id).cloned()
    }

    pub fn snapshot(&self) -> UnreadSnapshot {
        self.cache.lock().clone()
    }

    /// Register a subscriber; it receives the full snapshot on every change.
    pub fn add_listener(&self, listener: impl Fn(&UnreadSnapshot) + Send + Sync + 'static) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: u64) {
        self.listeners.lock().remove(&id);
    }

    /// Wipe the cache (logout teardown). Does not notify.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn notify_listeners(&self) {
        let snapshot = self.snapshot();
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}
