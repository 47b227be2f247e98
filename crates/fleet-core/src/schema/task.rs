//! Task history schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a completed or closed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// PR created, not yet merged or closed
    Open,
    /// PR was merged
    Merged,
    /// PR was closed without merging
    Closed,
    /// Task completed but no PR was created
    NoPr,
    /// Task failed (see `failure_reason`)
    Failed,
    /// Status could not be determined
    Unknown,
}

impl TaskStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Merged => "merged",
            TaskStatus::Closed => "closed",
            TaskStatus::NoPr => "no-pr",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
        }
    }
}

/// An append-only record of a finished task.
///
/// Once `completed_at` is set the entry is terminal; no client-side cache may
/// mutate it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    /// Worker name that ran the task
    pub name: String,

    /// Task description
    pub task: String,

    /// Git branch the work happened on
    pub branch: String,

    /// Pull request URL, if one was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,

    /// PR number for quick lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,

    /// Final status of the task
    pub status: TaskStatus,

    /// Brief summary of what was accomplished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Why the task failed, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// When the task was started
    pub created_at: DateTime<Utc>,

    /// When the task finished; set exactly once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_wire_strings() {
        assert_eq!(serde_json::to_string(&TaskStatus::NoPr).unwrap(), "\"no-pr\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Merged).unwrap(), "\"merged\"");
        let status: TaskStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, TaskStatus::Failed);
        assert_eq!(status.as_str(), "failed");
    }

    #[test]
    fn test_task_status_rejects_unknown_values() {
        assert!(serde_json::from_str::<TaskStatus>("\"in-progress\"").is_err());
        assert!(serde_json::from_str::<TaskStatus>("\"\"").is_err());
        assert!(serde_json::from_str::<TaskStatus>("1").is_err());
    }

    #[test]
    fn test_history_entry_roundtrip() {
        let json = r#"{
            "name": "worker-7",
            "task": "Fix flaky websocket test",
            "branch": "fleet/fix-flaky-ws",
            "pr_url": "https://github.com/acme/api/pull/481",
            "pr_number": 481,
            "status": "merged",
            "summary": "Stabilised reconnect backoff",
            "created_at": "2026-03-02T11:00:00Z",
            "completed_at": "2026-03-02T12:30:00Z"
        }"#;

        let entry: TaskHistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.name, "worker-7");
        assert_eq!(entry.pr_number, Some(481));
        assert_eq!(entry.status, TaskStatus::Merged);
        assert!(entry.failure_reason.is_none());

        let serialized = serde_json::to_string(&entry).unwrap();
        let reparsed: TaskHistoryEntry = serde_json::from_str(&serialized).unwrap();
        assert_eq!(entry, reparsed);
    }

    #[test]
    fn test_history_entry_optional_fields_stay_absent() {
        let json = r#"{
            "name": "worker-1",
            "task": "Bump deps",
            "branch": "fleet/bump-deps",
            "status": "no-pr",
            "created_at": "2026-03-02T11:00:00Z"
        }"#;
        let entry: TaskHistoryEntry = serde_json::from_str(json).unwrap();
        let serialized = serde_json::to_string(&entry).unwrap();
        assert!(!serialized.contains("pr_url"));
        assert!(!serialized.contains("completed_at"));
    }
}
