use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
///
/// `System` is a synthetic sender used for locally-injected error/status
/// messages. It is never attributed to either participant and never counts
/// toward unread totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Patient,
    Pharmacy,
    System,
}

impl SenderRole {
    /// Human-readable sender label used in notification titles.
    pub fn display_label(&self) -> &'static str {
        match self {
            SenderRole::Patient => "Patient",
            _ => "Pharmacy",
        }
    }
}

/// A single chat message. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a locally-injected `system` message stamped with the current time.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: SenderRole::System,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// One entry of the per-user unread aggregate returned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadEntry {
    pub count: u32,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

/// Aggregate unread map keyed by order id.
pub type UnreadCounts = HashMap<String, UnreadEntry>;

/// Request body for the idempotent create-or-fetch thread call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOrderRequest {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pharmacy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThreadResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitOrderResponse {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendResponse {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkReadResponse {
    pub success: bool,
}
