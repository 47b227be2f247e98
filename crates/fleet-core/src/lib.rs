//! Core library for agent-fleet
//!
//! This crate is the synchronization layer between tools and the `fleetd`
//! daemon, which owns every file under `~/.fleet/`. Three independent pieces,
//! composed by the caller:
//!
//! - [`client::DaemonClient`]: imperative commands over the daemon's Unix
//!   socket, one connection per call
//! - [`state_watcher::StateWatcher`]: a debounced in-memory mirror of
//!   `state.json`
//! - [`message_watcher::MessageWatcher`]: arrival notifications for message
//!   files, delivered at most once each
//!
//! Nothing here mutates daemon-owned data; caches are transient mirrors
//! replaced wholesale on each successful read. All schema types preserve
//! unknown fields for forward compatibility and round-trip without data loss.

pub mod client;
pub mod home;
pub mod logging;
pub mod message_watcher;
pub mod schema;
pub mod state_watcher;
mod watch;

pub use client::{ClientConfig, ClientError, DaemonClient, SpawnRequest};
pub use home::FleetHome;
pub use message_watcher::{MessageEvent, MessageRecord, MessageWatcher, MessageWatcherConfig};
pub use schema::{
    Agent, AgentKind, DaemonStatus, Message, Repository, SchemaError, State, TaskHistoryEntry,
    TaskStatus,
};
pub use state_watcher::{StateEvent, StateWatcher, StateWatcherConfig};
pub use watch::WatchError;
