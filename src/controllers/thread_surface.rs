use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ChatApi, InitOrderRequest, Message};
use crate::auth::AuthState;
use crate::models::{SessionParticipants, SessionRegistry, UnreadStore};

/// Everything the surface needs to know about the order it chats about,
/// resolved by the caller from the order record.
#[derive(Clone, Debug)]
pub struct OrderContext {
    pub order_id: String,
    pub order_number: String,
    pub patient_id: Option<String>,
    pub pharmacy_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Loading,
    Active,
    /// Initialization failed. Still interactive: `open` may be retried and
    /// the injected `system` message stays visible meanwhile.
    Failed,
    Closed,
}

struct SurfaceShared {
    state: SurfaceState,
    thread_id: Option<String>,
    messages: Vec<Message>,
}

struct SurfaceInner {
    api: Arc<dyn ChatApi>,
    registry: Arc<SessionRegistry>,
    unread: Arc<UnreadStore>,
    auth: Arc<AuthState>,
    order: OrderContext,
    refresh_interval: Duration,
    shared: Mutex<SurfaceShared>,
    sending: AtomicBool,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

/// Per-conversation controller behind one open chat panel.
///
/// Cheap to clone; clones share state, so the local refresh task and the
/// rendering layer observe the same transcript. Lifecycle:
/// `Uninitialized → open() → Active` (or `Failed`), then `close()`.
/// While Active a local timer re-fetches the transcript on its own cadence,
/// independent of the app-wide background poller.
#[derive(Clone)]
pub struct ThreadSurface {
    inner: Arc<SurfaceInner>,
}

impl ThreadSurface {
    pub fn new(
        api: Arc<dyn ChatApi>,
        registry: Arc<SessionRegistry>,
        unread: Arc<UnreadStore>,
        auth: Arc<AuthState>,
        order: OrderContext,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                api,
                registry,
                unread,
                auth,
                order,
                refresh_interval,
                shared: Mutex::new(SurfaceShared {
                    state: SurfaceState::Uninitialized,
                    thread_id: None,
                    messages: Vec::new(),
                }),
                sending: AtomicBool::new(false),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    /// Resolve-or-create the thread, load history, settle read state and
    /// start the local refresh timer.
    ///
    /// Callable from `Uninitialized` and, as a retry, from `Failed`.
    /// Initialization failure injects a local `system` message and leaves
    /// the registry untouched, so a thread that never resolved is never
    /// diffed.
    pub async fn open(&self) {
        {
            let mut shared = self.inner.shared.lock();
            match shared.state {
                SurfaceState::Uninitialized | SurfaceState::Failed => {
                    shared.state = SurfaceState::Loading;
                }
                _ => return,
            }
        }

        let order = &self.inner.order;
        let request = InitOrderRequest {
            order_id: order.order_id.clone(),
            pharmacy_id: order.pharmacy_id.clone(),
            patient_id: order.patient_id.clone(),
        };

        match self.inner.api.init_order_thread(&request).await {
            Ok(thread_id) => {
                debug!(order_id = %order.order_id, thread_id = %thread_id, "Chat surface opened");
                self.inner.shared.lock().thread_id = Some(thread_id.clone());

                self.inner.registry.register(
                    thread_id.clone(),
                    order.order_id.clone(),
                    order.order_number.clone(),
                    SessionParticipants {
                        patient_id: order.patient_id.clone(),
                        pharmacy_id: order.pharmacy_id.clone(),
                    },
                );

                // First refresh shows history and establishes the diff
                // baseline, so nothing already on screen re-notifies.
                self.refresh().await;

                // Best-effort: the surface stays usable if this fails, the
                // badge just survives until a later mark-read succeeds.
                if !self.inner.unread.mark_as_read(&thread_id, &order.order_id).await {
                    debug!(thread_id = %thread_id, "Read state not settled on open");
                }

                self.start_refresh_task();
                self.inner.shared.lock().state = SurfaceState::Active;
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "Failed to initialize chat thread");
                self.push_system_message(
                    "The conversation could not be loaded. Please try again.",
                );
                self.inner.shared.lock().state = SurfaceState::Failed;
            }
        }
    }

    /// Fetch the transcript, feed the diff detector and replace the
    /// displayed snapshot only when it actually changed (value comparison,
    /// not just length). Returns whether the display changed.
    pub async fn refresh(&self) -> bool {
        let thread_id = {
            let shared = self.inner.shared.lock();
            if shared.state == SurfaceState::Closed {
                return false;
            }
            match &shared.thread_id {
                Some(id) => id.clone(),
                None => return false,
            }
        };

        let messages = match self.inner.api.fetch_thread(&thread_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Transcript refresh failed");
                return false;
            }
        };

        if let Some(user) = self.inner.auth.current() {
            self.inner.registry.diff(&thread_id, &messages, &user);
        }

        let mut shared = self.inner.shared.lock();
        // An in-flight fetch that resolves after close must not resurrect
        // the transcript.
        if shared.state == SurfaceState::Closed {
            return false;
        }
        if shared.messages != messages {
            shared.messages = messages;
            true
        } else {
            false
        }
    }

    /// Post a message, then refetch the full transcript so the displayed
    /// order always matches the server (no local append).
    ///
    /// Returns `false` when the send is rejected outright: empty input, no
    /// resolved thread, or a prior send still in flight. A transport
    /// failure after acceptance surfaces as a local `system` message and
    /// still returns `true`.
    pub async fn send(&self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        let thread_id = match self.inner.shared.lock().thread_id.clone() {
            Some(id) => id,
            None => return false,
        };

        // Serialize sends per surface.
        if self
            .inner
            .sending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        match self.inner.api.send_message(&thread_id, content).await {
            Ok(_) => {
                self.refresh().await;
            }
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Failed to send message");
                self.push_system_message("Your message could not be sent. Please try again.");
            }
        }

        self.inner.sending.store(false, Ordering::SeqCst);
        true
    }

    /// Stop the local timer and unregister the session. Synchronous, so an
    /// in-flight fetch resolving afterwards diffs against an unregistered
    /// thread, which is a defined no-op.
    pub fn close(&self) {
        if let Some(task) = self.inner.refresh_task.lock().take() {
            task.abort();
        }

        let thread_id = {
            let mut shared = self.inner.shared.lock();
            if shared.state == SurfaceState::Closed {
                return;
            }
            shared.state = SurfaceState::Closed;
            shared.thread_id.clone()
        };

        if let Some(thread_id) = thread_id {
            self.inner.registry.unregister(&thread_id);
            debug!(thread_id = %thread_id, "Chat surface closed");
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.inner.shared.lock().state
    }

    pub fn thread_id(&self) -> Option<String> {
        self.inner.shared.lock().thread_id.clone()
    }

    /// Current displayed transcript, including locally-injected `system`
    /// messages.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.shared.lock().messages.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.sending.load(Ordering::SeqCst)
    }

    pub fn order(&self) -> &OrderContext {
        &self.inner.order
    }

    fn push_system_message(&self, text: &str) {
        self.inner.shared.lock().messages.push(Message::system(text));
    }

    fn start_refresh_task(&self) {
        let mut task = self.inner.refresh_task.lock();
        if let Some(existing) = task.take() {
            existing.abort();
        }

        let surface = self.clone();
        let interval = self.inner.refresh_interval;
        *task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                surface.refresh().await;
            }
        }));
    }
}

impl Drop for SurfaceInner {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.lock().take() {
            task.abort();
        }
    }
}
