//! Chat and notification synchronization for the patient-pharmacy ordering
//! platform.
//!
//! Keeps independently-mounted conversation surfaces consistent with
//! server-held message state using periodic polling:
//! - [`models::SessionRegistry`] tracks open threads and detects genuinely
//!   new counterpart messages exactly once per batch
//! - [`models::UnreadStore`] caches the per-order unread aggregate with an
//!   optimistic clear on mark-read
//! - [`services::BackgroundPoller`] re-fetches every open thread on a single
//!   app-wide timer, so toasts surface for unfocused conversations
//! - [`controllers::ThreadSurface`] drives one open chat panel: thread
//!   resolution, history, sends and a faster local refresh
//!
//! The backend is consumed through the [`api::ChatApi`] boundary only; all
//! state is in-memory for the lifetime of the authenticated session and is
//! wiped by [`services::ChatSyncService::shutdown`].

pub mod api;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, ChatApi, HttpChatApi, Message, SenderRole};
pub use auth::{AuthState, CurrentUser};
pub use config::SyncConfig;
pub use controllers::{OrderContext, SurfaceState, ThreadSurface};
pub use models::{
    DiffOutcome, Notification, NotificationKind, NotificationQueue, SessionRegistry, UnreadStore,
};
pub use services::ChatSyncService;
