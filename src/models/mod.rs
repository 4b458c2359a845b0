pub mod notification_queue;
pub mod session_registry;
pub mod unread_store;

pub use notification_queue::{Notification, NotificationKind, NotificationQueue};
pub use session_registry::{ChatSession, DiffOutcome, SessionParticipants, SessionRegistry};
pub use unread_store::{UnreadRecord, UnreadSnapshot, UnreadStore};
