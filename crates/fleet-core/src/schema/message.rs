//! Inter-agent message schema
//!
//! Messages live one per file at
//! `<messages-root>/<repo>/<agent>/<message-id>.json`. The daemon writes each
//! file exactly once; the recipient acknowledges by flagging or deleting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single inter-agent message.
///
/// `id` is unique within its (repository, agent) scope, not globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier (also the file stem on disk)
    pub id: String,

    /// Sender agent name
    pub from: String,

    /// Recipient agent name
    pub to: String,

    /// Free-text message body
    pub content: String,

    /// When the daemon wrote the message
    pub created_at: DateTime<Utc>,

    /// Set once the recipient has processed the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged: Option<bool>,

    /// When the message was acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl Message {
    /// Whether the recipient has acknowledged the message.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.unwrap_or(false)
    }
}
