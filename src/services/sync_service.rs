use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::ChatApi;
use crate::auth::{AuthState, CurrentUser};
use crate::config::SyncConfig;
use crate::controllers::{OrderContext, ThreadSurface};
use crate::models::{
    Notification, NotificationQueue, SessionRegistry, UnreadSnapshot, UnreadStore,
};

use super::background_poller::BackgroundPoller;

/// Process-wide wiring of the chat synchronization subsystem.
///
/// Owns the singleton stores, the background poller and the periodic unread
/// refresh, all tied to the presence of an authenticated user. One instance
/// exists per authenticated session and is torn down explicitly on logout;
/// the rest of the application talks to the subsystem through this type.
pub struct ChatSyncService {
    api: Arc<dyn ChatApi>,
    auth: Arc<AuthState>,
    registry: Arc<SessionRegistry>,
    unread: Arc<UnreadStore>,
    notifications: Arc<NotificationQueue>,
    poller: Arc<BackgroundPoller>,
    unread_task: Mutex<Option<JoinHandle<()>>>,
    config: SyncConfig,
}

impl ChatSyncService {
    pub fn new(api: Arc<dyn ChatApi>, config: SyncConfig) -> Self {
        let auth = Arc::new(AuthState::new());
        let notifications = Arc::new(NotificationQueue::new(config.toast_ttl));
        let registry = Arc::new(SessionRegistry::new(notifications.clone()));
        let unread = Arc::new(UnreadStore::new(api.clone(), auth.clone()));
        let poller = Arc::new(BackgroundPoller::new(
            api.clone(),
            registry.clone(),
            auth.clone(),
            config.poll_interval,
        ));

        Self {
            api,
            auth,
            registry,
            unread,
            notifications,
            poller,
            unread_task: Mutex::new(None),
            config,
        }
    }

    /// Bind the subsystem to an authenticated user and start both app-wide
    /// timers. Idempotent under rapid auth changes: a restart replaces any
    /// prior timers instead of stacking them.
    pub fn start(&self, user: CurrentUser) {
        info!(user_id = %user.id, "Chat sync starting");
        self.auth.set_user(user);
        self.poller.start();

        let mut task = self.unread_task.lock();
        if let Some(existing) = task.take() {
            existing.abort();
        }
        let unread = self.unread.clone();
        let interval = self.config.unread_refresh_interval;
        *task = Some(tokio::spawn(async move {
            // Populate badges right away, then hold the cadence.
            unread.refresh().await;
            loop {
                tokio::time::sleep(interval).await;
                unread.refresh().await;
            }
        }));
    }

    /// Logout teardown: stop every timer and wipe all per-account state so
    /// nothing leaks into the next session.
    pub fn shutdown(&self) {
        info!("Chat sync shutting down");
        self.poller.stop();
        if let Some(task) = self.unread_task.lock().take() {
            task.abort();
        }
        self.auth.clear();
        self.registry.clear();
        self.unread.clear();
        self.notifications.clear();
        debug!("Chat sync state wiped");
    }

    /// Build the controller for one order's chat panel. The caller drives
    /// `open`/`close`; registration happens inside `open`.
    pub fn open_surface(&self, order: OrderContext) -> ThreadSurface {
        ThreadSurface::new(
            self.api.clone(),
            self.registry.clone(),
            self.unread.clone(),
            self.auth.clone(),
            order,
            self.config.surface_refresh_interval,
        )
    }

    /// Badge lookup for anywhere an order is listed.
    pub fn unread_count(&self, order_id: &str) -> u32 {
        self.unread.unread_count(order_id)
    }

    pub fn total_unread(&self) -> u32 {
        self.unread.total_unread()
    }

    /// Clear read state for an order without opening its chat (e.g. from a
    /// list view). Resolves the thread id from the unread cache; an order
    /// with no unread entry is a no-op.
    pub async fn mark_chat_as_read(&self, order_id: &str) {
        let Some(record) = self.unread.record(order_id) else {
            debug!(order_id = %order_id, "No unread entry to clear");
            return;
        };
        self.unread.mark_as_read(&record.thread_id, order_id).await;
    }

    pub fn on_unread_change(
        &self,
        listener: impl Fn(&UnreadSnapshot) + Send + Sync + 'static,
    ) -> u64 {
        self.unread.add_listener(listener)
    }

    pub fn on_notification(
        &self,
        listener: impl Fn(&[Notification]) + Send + Sync + 'static,
    ) -> u64 {
        self.notifications.add_listener(listener)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn unread(&self) -> &Arc<UnreadStore> {
        &self.unread
    }

    pub fn notifications(&self) -> &Arc<NotificationQueue> {
        &self.notifications
    }

    pub fn auth(&self) -> &Arc<AuthState> {
        &self.auth
    }

    pub fn poller(&self) -> &Arc<BackgroundPoller> {
        &self.poller
    }
}

impl Drop for ChatSyncService {
    fn drop(&mut self) {
        if let Some(task) = self.unread_task.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SenderRole;
    use crate::test_support::MockChatApi;

    fn service(api: Arc<MockChatApi>) -> ChatSyncService {
        ChatSyncService::new(api, SyncConfig::default())
    }

    fn user() -> CurrentUser {
        CurrentUser::new("pat-1", SenderRole::Patient)
    }

    #[tokio::test]
    async fn start_binds_user_and_spins_up_timers() {
        let api = Arc::new(MockChatApi::new());
        let svc = service(api);

        svc.start(user());
        assert!(svc.auth().is_authenticated());
        assert!(svc.poller().is_running());
        assert!(svc.unread_task.lock().is_some());
    }

    #[tokio::test]
    async fn restart_replaces_timers_instead_of_stacking() {
        let api = Arc::new(MockChatApi::new());
        let svc = service(api);

        svc.start(user());
        svc.start(user());
        assert!(svc.poller().is_running());

        svc.shutdown();
        assert!(!svc.poller().is_running());
    }

    #[tokio::test]
    async fn shutdown_wipes_all_per_account_state() {
        let api = Arc::new(MockChatApi::new());
        api.set_unread("ord-1", 2, "t1");
        let svc = service(api.clone());
        svc.start(user());

        svc.unread().refresh().await;
        svc.registry().register(
            "t1",
            "ord-1",
            "RX-1",
            crate::models::SessionParticipants::default(),
        );
        svc.notifications()
            .push(crate::models::NotificationKind::Info, "t", "b", None, true);

        svc.shutdown();
        assert!(!svc.auth().is_authenticated());
        assert!(svc.registry().is_empty());
        assert_eq!(svc.unread_count("ord-1"), 0);
        assert!(svc.notifications().active().is_empty());
    }

    #[tokio::test]
    async fn mark_chat_as_read_resolves_thread_from_cache() {
        let api = Arc::new(MockChatApi::new());
        api.set_unread("ord-1", 2, "t1");
        let svc = service(api.clone());
        svc.start(user());
        svc.unread().refresh().await;

        svc.mark_chat_as_read("ord-1").await;
        assert_eq!(svc.unread_count("ord-1"), 0);
        assert_eq!(api.mark_read_calls(), 1);

        // Unknown order: nothing to do, no boundary call.
        svc.mark_chat_as_read("ord-unknown").await;
        assert_eq!(api.mark_read_calls(), 1);
    }
}
