//! Control-channel wire envelopes
//!
//! Requests are one JSON document terminated by a newline; responses are one
//! JSON document with no guaranteed trailing delimiter, so readers detect
//! completion by a successful decode rather than by framing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single command sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketRequest {
    /// Command name, e.g. `ping` or `spawn_worker`
    pub command: String,

    /// Command-specific arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, serde_json::Value>>,
}

impl SocketRequest {
    /// Build a request without arguments.
    pub fn bare(command: impl Into<String>) -> Self {
        SocketRequest {
            command: command.into(),
            args: None,
        }
    }

    /// Build a request with an argument object.
    pub fn with_args(
        command: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        SocketRequest {
            command: command.into(),
            args: Some(args),
        }
    }
}

/// The daemon's reply to a [`SocketRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketResponse {
    /// Whether the command succeeded
    pub success: bool,

    /// Command payload, present on success for commands that return data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message, present when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SocketResponse {
    /// Successful response carrying `data`.
    pub fn ok(data: serde_json::Value) -> Self {
        SocketResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure response carrying an error message.
    pub fn err(message: impl Into<String>) -> Self {
        SocketResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Payload of the `status` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Whether the daemon reports itself as running
    pub running: bool,

    /// Daemon process ID
    pub pid: u32,

    /// Number of tracked repositories
    pub repos: usize,

    /// Number of agents across all repositories
    pub agents: usize,

    /// Socket path the daemon is serving on
    pub socket_path: String,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}
