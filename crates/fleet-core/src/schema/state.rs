//! Root daemon state schema
//!
//! The daemon persists its entire view of the world as one JSON document,
//! rewritten atomically on every change. Everything here is a transient
//! mirror of that file; caches are replaced wholesale, never patched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::agent::{Agent, AgentKind};
use super::task::TaskHistoryEntry;

/// Which PRs a merge-queue or pr-shepherd agent tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackMode {
    /// Every PR in the repository
    All,
    /// Only PRs authored by the fleet user
    Author,
    /// Only PRs explicitly assigned to the fleet user
    Assigned,
}

/// Configuration for a repository's merge-queue agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeQueueConfig {
    /// Whether the merge queue agent should run
    pub enabled: bool,

    /// Which PRs to track
    pub track_mode: TrackMode,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl Default for MergeQueueConfig {
    fn default() -> Self {
        MergeQueueConfig {
            enabled: true,
            track_mode: TrackMode::All,
            unknown_fields: HashMap::new(),
        }
    }
}

/// Configuration for a repository's pr-shepherd agent (fork mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrShepherdConfig {
    /// Whether the pr-shepherd agent should run
    pub enabled: bool,

    /// Which PRs to track
    pub track_mode: TrackMode,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl Default for PrShepherdConfig {
    fn default() -> Self {
        PrShepherdConfig {
            enabled: true,
            track_mode: TrackMode::Author,
            unknown_fields: HashMap::new(),
        }
    }
}

/// Fork relationship of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkConfig {
    /// True when the repository was detected as a fork
    pub is_fork: bool,

    /// URL of the upstream repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,

    /// Owner of the upstream repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_owner: Option<String>,

    /// Name of the upstream repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_repo: Option<String>,

    /// Forces fork mode even for non-forks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_fork_mode: Option<bool>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// A tracked repository's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// GitHub URL of the repository
    pub github_url: String,

    /// Tmux session hosting this repository's agents
    pub tmux_session: String,

    /// Map of agent name to agent state
    pub agents: BTreeMap<String, Agent>,

    /// Completed task history; entries carry their own timestamps, ordering
    /// is a display concern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_history: Option<Vec<TaskHistoryEntry>>,

    /// Merge queue configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_queue_config: Option<MergeQueueConfig>,

    /// PR shepherd configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_shepherd_config: Option<PrShepherdConfig>,

    /// Fork configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_config: Option<ForkConfig>,

    /// Branch PRs target (usually "main")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

/// The entire daemon state.
///
/// `current_repo`, when present, should name a key of `repos`; snapshots
/// taken mid-change may dangle, which [`State::current_repository`] resolves
/// to `None` instead of treating as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Map of repository name to repository state
    pub repos: BTreeMap<String, Repository>,

    /// Current/default repository name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_repo: Option<String>,

    /// Unknown fields for forward compatibility
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

impl State {
    /// Look up a repository by name.
    pub fn repo(&self, name: &str) -> Option<&Repository> {
        self.repos.get(name)
    }

    /// Resolve `current_repo` against the repository map.
    pub fn current_repository(&self) -> Option<&Repository> {
        self.current_repo.as_deref().and_then(|name| self.repos.get(name))
    }

    /// Agents of one repository; empty when the repository is unknown.
    pub fn agents_for(&self, repo: &str) -> impl Iterator<Item = (&String, &Agent)> + '_ {
        self.repos
            .get(repo)
            .into_iter()
            .flat_map(|repository| repository.agents.iter())
    }

    /// All agents across all repositories as (repo, name, agent) triples.
    pub fn all_agents(&self) -> impl Iterator<Item = (&String, &String, &Agent)> + '_ {
        self.repos.iter().flat_map(|(repo_name, repository)| {
            repository
                .agents
                .iter()
                .map(move |(agent_name, agent)| (repo_name, agent_name, agent))
        })
    }

    /// Worker agents with a live process, across all repositories.
    pub fn active_workers(&self) -> impl Iterator<Item = (&String, &String, &Agent)> + '_ {
        self.all_agents()
            .filter(|(_, _, agent)| agent.kind == AgentKind::Worker && agent.is_running())
    }
}
