//! Schema types for the fleet daemon's wire and file formats
//!
//! Everything the daemon writes (the state file, message files, and socket
//! responses) arrives as untrusted JSON and passes through here before the
//! rest of the crate trusts it. Unknown object fields are preserved for
//! forward compatibility; unknown enum values are rejected.
//!
//! Two access patterns are provided for every top-level shape: `parse_*`
//! returns a descriptive [`SchemaError`] for call sites that report what was
//! wrong, and `safe_parse_*` returns `None` for call sites that only care
//! whether the value is usable.

mod agent;
mod message;
mod state;
mod task;
mod wire;

pub use agent::{Agent, AgentKind};
pub use message::Message;
pub use state::{ForkConfig, MergeQueueConfig, PrShepherdConfig, Repository, State, TrackMode};
pub use task::{TaskHistoryEntry, TaskStatus};
pub use wire::{DaemonStatus, SocketRequest, SocketResponse};

use serde::de::DeserializeOwned;

/// Well-formed JSON that does not match the expected shape.
#[derive(Debug, thiserror::Error)]
#[error("value does not match the {expected} schema: {source}")]
pub struct SchemaError {
    expected: &'static str,
    #[source]
    source: serde_json::Error,
}

impl SchemaError {
    pub(crate) fn new(expected: &'static str, source: serde_json::Error) -> Self {
        SchemaError { expected, source }
    }

    /// Name of the shape the value failed to match.
    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

fn parse_as<T: DeserializeOwned>(
    expected: &'static str,
    value: serde_json::Value,
) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|source| SchemaError { expected, source })
}

/// Parse a full daemon state snapshot.
pub fn parse_state(value: serde_json::Value) -> Result<State, SchemaError> {
    parse_as("State", value)
}

/// Parse a single repository entry.
pub fn parse_repository(value: serde_json::Value) -> Result<Repository, SchemaError> {
    parse_as("Repository", value)
}

/// Parse a single agent entry.
pub fn parse_agent(value: serde_json::Value) -> Result<Agent, SchemaError> {
    parse_as("Agent", value)
}

/// Parse an inter-agent message file payload.
pub fn parse_message(value: serde_json::Value) -> Result<Message, SchemaError> {
    parse_as("Message", value)
}

/// Parse one task history entry.
pub fn parse_task_history_entry(value: serde_json::Value) -> Result<TaskHistoryEntry, SchemaError> {
    parse_as("TaskHistoryEntry", value)
}

/// Parse a control-channel response envelope.
pub fn parse_socket_response(value: serde_json::Value) -> Result<SocketResponse, SchemaError> {
    parse_as("SocketResponse", value)
}

/// Parse the `status` command payload.
pub fn parse_daemon_status(value: serde_json::Value) -> Result<DaemonStatus, SchemaError> {
    parse_as("DaemonStatus", value)
}

/// [`parse_state`] that swallows the error.
pub fn safe_parse_state(value: serde_json::Value) -> Option<State> {
    parse_state(value).ok()
}

/// [`parse_repository`] that swallows the error.
pub fn safe_parse_repository(value: serde_json::Value) -> Option<Repository> {
    parse_repository(value).ok()
}

/// [`parse_agent`] that swallows the error.
pub fn safe_parse_agent(value: serde_json::Value) -> Option<Agent> {
    parse_agent(value).ok()
}

/// [`parse_message`] that swallows the error.
pub fn safe_parse_message(value: serde_json::Value) -> Option<Message> {
    parse_message(value).ok()
}
