//! Scripted [`ChatApi`] double shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::api::{
    ApiError, ApiResult, ChatApi, InitOrderRequest, Message, SenderRole, UnreadCounts, UnreadEntry,
};

/// In-memory backend: threads keyed by id, unread aggregate keyed by order id,
/// per-endpoint failure switches, and call counters.
#[derive(Default)]
pub struct MockChatApi {
    threads: Mutex<HashMap<String, Vec<Message>>>,
    unread: Mutex<UnreadCounts>,
    fail_fetch: AtomicBool,
    fail_init: AtomicBool,
    fail_send: AtomicBool,
    fail_unread: AtomicBool,
    fail_mark_read: AtomicBool,
    fetch_calls: AtomicUsize,
    init_calls: AtomicUsize,
    send_calls: AtomicUsize,
    unread_fetches: AtomicUsize,
    mark_read_calls: AtomicUsize,
}

impl MockChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable() -> ApiError {
        ApiError::Status { status: 503 }
    }

    pub fn set_thread(&self, thread_id: &str, messages: Vec<Message>) {
        self.threads.lock().insert(thread_id.to_string(), messages);
    }

    pub fn push_message(&self, thread_id: &str, sender: SenderRole, content: &str) {
        self.threads
            .lock()
            .entry(thread_id.to_string())
            .or_default()
            .push(Message {
                sender,
                content: content.to_string(),
                created_at: Utc::now(),
            });
    }

    pub fn thread_len(&self, thread_id: &str) -> usize {
        self.threads.lock().get(thread_id).map_or(0, Vec::len)
    }

    pub fn set_unread(&self, order_id: &str, count: u32, thread_id: &str) {
        self.unread.lock().insert(
            order_id.to_string(),
            UnreadEntry {
                count,
                thread_id: thread_id.to_string(),
                last_message: None,
            },
        );
    }

    pub fn clear_unread(&self) {
        self.unread.lock().clear();
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn fail_unread(&self, fail: bool) {
        self.fail_unread.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn unread_fetches(&self) -> usize {
        self.unread_fetches.load(Ordering::SeqCst)
    }

    pub fn mark_read_calls(&self) -> usize {
        self.mark_read_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn fetch_thread(&self, thread_id: &str) -> ApiResult<Vec<Message>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.threads.lock().get(thread_id).cloned().unwrap_or_default())
    }

    async fn init_order_thread(&self, request: &InitOrderRequest) -> ApiResult<String> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        // Idempotent per order: the same order always resolves the same thread.
        let thread_id = format!("thread-{}", request.order_id);
        self.threads.lock().entry(thread_id.clone()).or_default();
        Ok(thread_id)
    }

    async fn send_message(&self, thread_id: &str, content: &str) -> ApiResult<Message> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let message = Message {
            sender: SenderRole::Patient,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.threads
            .lock()
            .entry(thread_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn fetch_unread_counts(&self) -> ApiResult<UnreadCounts> {
        self.unread_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_unread.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.unread.lock().clone())
    }

    async fn mark_thread_read(&self, thread_id: &str) -> ApiResult<()> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let _ = thread_id;
        Ok(())
    }
}
