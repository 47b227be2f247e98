//! Agent schema for daemon state snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role of an agent within its repository.
///
/// The set is closed: the daemon only ever writes these seven tags, and any
/// other value (including the empty string) fails validation rather than
/// being coerced to a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Main orchestrator for a repository
    Supervisor,
    /// Executes one specific task, then settles
    Worker,
    /// Monitors and merges approved PRs
    MergeQueue,
    /// Monitors PRs in fork mode
    PrShepherd,
    /// Interactive workspace agent
    Workspace,
    /// Reviews a specific PR
    Review,
    /// Custom long-lived agents
    GenericPersistent,
}

impl AgentKind {
    /// Wire representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Supervisor => "supervisor",
            AgentKind::Worker => "worker",
            AgentKind::MergeQueue => "merge-queue",
            AgentKind::PrShepherd => "pr-shepherd",
            AgentKind::Workspace => "workspace",
            AgentKind::Review => "review",
            AgentKind::GenericPersistent => "generic-persistent",
        }
    }

    /// Whether agents of this kind survive routine cleanup passes.
    ///
    /// Workers and reviewers are one-shot; everything else stays up until
    /// explicitly removed.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, AgentKind::Worker | AgentKind::Review)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single agent's state, as stored in its repository's agent map.
///
/// An agent belongs to exactly one repository; it exists only as a value in
/// that repository's `agents` mapping. The daemon sets at most one of
/// `summary` and `failure_reason` once a worker settles; that is not enforced
/// at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Agent role tag (wire field `type`)
    #[serde(rename = "type")]
    pub kind: AgentKind,

    /// Path to the agent's git worktree
    pub worktree_path: String,

    /// Tmux window identifier
    pub tmux_window: String,

    /// Session ID of the underlying agent process
    pub session_id: String,

    /// Process ID; `0` or absent means not currently running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Task description (workers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Brief summary of completed work (workers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Why the task failed (workers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// When the agent was created
    pub created_at: DateTime<Utc>,

    /// Last time the agent was nudged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_nudge: Option<DateTime<Utc>>,

    /// Signals worker completion and eligibility for cleanup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_for_cleanup: Option<bool>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl Agent {
    /// Whether the agent has a live process behind it.
    pub fn is_running(&self) -> bool {
        self.pid.is_some_and(|pid| pid > 0)
    }
}
