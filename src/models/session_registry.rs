use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::{Message, SenderRole};
use crate::auth::CurrentUser;

use super::notification_queue::{NotificationKind, NotificationQueue};

/// Longest message preview embedded in a toast body.
const PREVIEW_CHARS: usize = 120;

/// Participant pair of an order conversation, as resolved from the order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionParticipants {
    pub patient_id: Option<String>,
    pub pharmacy_id: Option<String>,
}

/// One currently-open chat surface tracked by the registry.
#[derive(Clone, Debug)]
pub struct ChatSession {
    pub thread_id: String,
    pub order_id: String,
    pub order_number: String,
    pub participants: SessionParticipants,
    pub registered_at: DateTime<Utc>,
    /// Last message count observed by `diff`. `None` until the first diff
    /// after registration establishes it, so a just-opened thread never
    /// re-notifies for history already on screen.
    baseline: Option<usize>,
}

/// Result of feeding one transcript snapshot to the diff detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffOutcome {
    /// The thread has no registered session; defined as a no-op.
    UnknownThread,
    /// Message count matches the baseline.
    Unchanged,
    /// First diff after registration; baseline recorded silently.
    BaselineEstablished { baseline: usize },
    /// The transcript shrank server-side; baseline resynchronized downward.
    Resynced { baseline: usize },
    /// The transcript grew. `notified` is true when the new tail contained
    /// at least one counterpart message and a toast was enqueued.
    Advanced { new_messages: usize, notified: bool },
}

/// Process-wide table of open conversation threads.
///
/// At most one [`ChatSession`] exists per thread id; re-registration
/// overwrites metadata but keeps the diff baseline, so two surfaces for the
/// same thread share one monotonically-advancing read position ("last
/// register wins"). All mutation goes through the methods here.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, ChatSession>>,
    notifications: Arc<NotificationQueue>,
}

impl SessionRegistry {
    pub fn new(notifications: Arc<NotificationQueue>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            notifications,
        }
    }

    /// Upsert a session for an opened chat surface.
    ///
    /// Resets nothing besides the metadata: an existing baseline survives,
    /// and a fresh session starts with no baseline at all (the next diff
    /// establishes it).
    pub fn register(
        &self,
        thread_id: impl Into<String>,
        order_id: impl Into<String>,
        order_number: impl Into<String>,
        participants: SessionParticipants,
    ) {
        let thread_id = thread_id.into();
        let mut sessions = self.sessions.lock();
        let baseline = sessions.get(&thread_id).and_then(|s| s.baseline);
        debug!(thread_id = %thread_id, existing = baseline.is_some(), "Registering chat session");
        sessions.insert(
            thread_id.clone(),
            ChatSession {
                thread_id,
                order_id: order_id.into(),
                order_number: order_number.into(),
                participants,
                registered_at: Utc::now(),
                baseline,
            },
        );
    }

    /// Remove a session and its baseline when a surface closes.
    pub fn unregister(&self, thread_id: &str) {
        if self.sessions.lock().remove(thread_id).is_some() {
            debug!(thread_id = %thread_id, "Unregistered chat session");
        }
    }

    /// Compare a full transcript snapshot against the stored baseline and
    /// enqueue at most one toast for a genuinely new tail of counterpart
    /// messages. The baseline always advances to the snapshot length.
    pub fn diff(
        &self,
        thread_id: &str,
        messages: &[Message],
        current_user: &CurrentUser,
    ) -> DiffOutcome {
        let (outcome, toast) = {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(thread_id) else {
                return DiffOutcome::UnknownThread;
            };

            let count = messages.len();
            match session.baseline {
                None => {
                    session.baseline = Some(count);
                    (DiffOutcome::BaselineEstablished { baseline: count }, None)
                }
                Some(baseline) if count == baseline => (DiffOutcome::Unchanged, None),
                Some(baseline) if count < baseline => {
                    warn!(
                        thread_id = %thread_id,
                        baseline,
                        count,
                        "Transcript shorter than baseline, resynchronizing"
                    );
                    session.baseline = Some(count);
                    (DiffOutcome::Resynced { baseline: count }, None)
                }
                Some(baseline) => {
                    let newest = messages[baseline..]
                        .iter()
                        .rev()
                        .find(|m| m.sender != current_user.role && m.sender != SenderRole::System);
                    let toast = newest.map(|message| ToastParams {
                        sender: message.sender,
                        preview: preview(&message.content),
                        order_id: session.order_id.clone(),
                        order_number: session.order_number.clone(),
                    });
                    session.baseline = Some(count);
                    (
                        DiffOutcome::Advanced {
                            new_messages: count - baseline,
                            notified: toast.is_some(),
                        },
                        toast,
                    )
                }
            }
        };

        if let Some(toast) = toast {
            debug!(thread_id = %thread_id, order_id = %toast.order_id, "New counterpart message");
            self.notifications.push(
                NotificationKind::ChatMessage,
                format!("New message from {}", toast.sender.display_label()),
                format!("Order {}: {}", toast.order_number, toast.preview),
                Some(toast.order_id),
                false,
            );
        }

        outcome
    }

    pub fn session(&self, thread_id: &str) -> Option<ChatSession> {
        self.sessions.lock().get(thread_id).cloned()
    }

    /// Thread ids of all open sessions, for the background poller.
    pub fn threads(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.sessions.lock().contains_key(thread_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Drop every session (logout teardown).
    pub fn clear(&self) {
        self.sessions.lock().clear();
    }
}

struct ToastParams {
    sender: SenderRole,
    preview: String,
    order_id: String,
    order_number: String,
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}
