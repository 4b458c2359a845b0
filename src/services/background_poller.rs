use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ChatApi;
use crate::auth::AuthState;
use crate::models::SessionRegistry;

/// App-wide poll loop over every registered chat session.
///
/// One instance exists per authenticated session. Each tick re-fetches the
/// transcript of every open thread and feeds it to the registry's diff
/// detector, so counterpart messages surface as toasts even when no chat
/// window is focused. Surfaces run their own faster local refresh on top;
/// the shared baseline makes the overlap safe.
pub struct BackgroundPoller {
    api: Arc<dyn ChatApi>,
    registry: Arc<SessionRegistry>,
    auth: Arc<AuthState>,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundPoller {
    pub fn new(
        api: Arc<dyn ChatApi>,
        registry: Arc<SessionRegistry>,
        auth: Arc<AuthState>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            registry,
            auth,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Start the repeating tick. Idempotent: an already-running timer is
    /// aborted before the replacement spawns, so rapid auth changes never
    /// leak a second concurrent poller.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock();
        if let Some(existing) = handle.take() {
            existing.abort();
            debug!("Aborted existing background poller before restart");
        }

        let poller = Arc::clone(self);
        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick resolves immediately; skip it so a fresh start
            // does not race the surface's own initial load.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                poller.poll_once().await;
            }
        }));
    }

    /// Clear the timer. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            debug!("Background poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// One tick: walk all registered sessions and diff their transcripts.
    /// A failed fetch for one thread is logged and does not stop the rest.
    pub async fn poll_once(&self) {
        let Some(user) = self.auth.current() else {
            return;
        };

        for thread_id in self.registry.threads() {
            match self.api.fetch_thread(&thread_id).await {
                Ok(messages) => {
                    self.registry.diff(&thread_id, &messages, &user);
                }
                Err(e) => {
                    warn!(thread_id = %thread_id, error = %e, "Background poll fetch failed");
                }
            }
        }
    }
}

impl Drop for BackgroundPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SenderRole;
    use crate::auth::CurrentUser;
    use crate::models::{NotificationQueue, SessionParticipants};
    use crate::test_support::MockChatApi;

    struct Fixture {
        api: Arc<MockChatApi>,
        registry: Arc<SessionRegistry>,
        auth: Arc<AuthState>,
        queue: Arc<NotificationQueue>,
    }

    fn fixture(authenticated: bool) -> Fixture {
        let api = Arc::new(MockChatApi::new());
        let queue = Arc::new(NotificationQueue::new(Duration::from_secs(5)));
        let registry = Arc::new(SessionRegistry::new(queue.clone()));
        let auth = Arc::new(AuthState::new());
        if authenticated {
            auth.set_user(CurrentUser::new("ph-1", SenderRole::Pharmacy));
        }
        Fixture {
            api,
            registry,
            auth,
            queue,
        }
    }

    fn poller(f: &Fixture) -> Arc<BackgroundPoller> {
        Arc::new(BackgroundPoller::new(
            f.api.clone(),
            f.registry.clone(),
            f.auth.clone(),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn tick_without_auth_fetches_nothing() {
        let f = fixture(false);
        f.registry
            .register("t1", "ord-1", "RX-1", SessionParticipants::default());

        poller(&f).poll_once().await;
        assert_eq!(f.api.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn tick_diffs_every_registered_session() {
        let f = fixture(true);
        let user = f.auth.current().unwrap();
        for thread in ["t1", "t2"] {
            f.registry
                .register(thread, "ord-1", "RX-1", SessionParticipants::default());
            // Establish an empty baseline so new messages count as new.
            f.registry.diff(thread, &[], &user);
        }
        f.api.push_message("t1", SenderRole::Patient, "any refills left?");

        poller(&f).poll_once().await;
        assert_eq!(f.api.fetch_calls(), 2);
        assert_eq!(f.queue.active().len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_does_not_stop_other_threads() {
        let f = fixture(true);
        f.registry
            .register("t1", "ord-1", "RX-1", SessionParticipants::default());
        f.registry
            .register("t2", "ord-2", "RX-2", SessionParticipants::default());

        f.api.fail_fetch(true);
        poller(&f).poll_once().await;
        assert_eq!(f.api.fetch_calls(), 2);
        assert!(f.queue.active().is_empty());
    }

    #[tokio::test]
    async fn start_twice_leaves_one_live_timer_and_stop_clears_it() {
        let f = fixture(true);
        let p = poller(&f);

        p.start();
        assert!(p.is_running());
        p.start();
        assert!(p.is_running());

        p.stop();
        assert!(!p.is_running());
        // Stopping again is a no-op.
        p.stop();
    }

    #[tokio::test]
    async fn repoll_of_same_snapshot_stays_silent() {
        let f = fixture(true);
        let user = f.auth.current().unwrap();
        f.registry
            .register("t1", "ord-1", "RX-1", SessionParticipants::default());
        f.registry.diff("t1", &[], &user);
        f.api.push_message("t1", SenderRole::Patient, "hello");

        let p = poller(&f);
        p.poll_once().await;
        p.poll_once().await;
        // Overlapping timers may re-diff the same transcript; the baseline
        // advance keeps it to one toast.
        assert_eq!(f.queue.active().len(), 1);
    }
}
