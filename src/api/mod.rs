//! Boundary API client for the chat backend.
//!
//! The backend is an external collaborator; this module only defines the
//! client seam ([`ChatApi`]) and its HTTP implementation. Everything above it
//! (stores, poller, surfaces) talks to an `Arc<dyn ChatApi>` so tests can
//! substitute a scripted double.

mod error;
mod http;
mod types;

use async_trait::async_trait;

pub use error::{ApiError, ApiResult};
pub use http::HttpChatApi;
pub use types::{InitOrderRequest, Message, SenderRole, UnreadCounts, UnreadEntry};

/// Object-safe client over the five chat endpoints.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /chat/{threadId}`: full transcript snapshot, oldest first.
    async fn fetch_thread(&self, thread_id: &str) -> ApiResult<Vec<Message>>;

    /// `POST /chat/init-order`: idempotent create-or-fetch keyed by order id.
    async fn init_order_thread(&self, request: &InitOrderRequest) -> ApiResult<String>;

    /// `POST /chat/send`: append a message to a thread.
    async fn send_message(&self, thread_id: &str, content: &str) -> ApiResult<Message>;

    /// `GET /chat/unread-counts`: the authenticated user's unread aggregate.
    async fn fetch_unread_counts(&self) -> ApiResult<UnreadCounts>;

    /// `PUT /chat/thread/{threadId}/mark-read`: persist read position.
    async fn mark_thread_read(&self, thread_id: &str) -> ApiResult<()>;
}
