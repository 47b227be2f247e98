//! Watches the message tree for newly delivered message files.
//!
//! The daemon writes one file per message at
//! `${FLEET_HOME}/messages/<repo>/<agent>/<message-id>.json`. This watcher
//! emits each file at most once per instance: a baseline scan records every
//! file that already exists, and only paths outside that baseline (and not
//! already emitted) are read, validated, and delivered. Restarting the
//! process re-baselines, so the backlog is never replayed as fake arrivals.
//!
//! Scoping to one repository and/or one agent filters what is *emitted*;
//! out-of-scope files are still marked seen so a later scope change in a new
//! instance starts from a clean baseline of its own.
//!
//! [`MessageWatcher::pending_messages`] is the pull-side complement: it walks
//! the tree on demand and returns every unacknowledged message, regardless of
//! whether the watcher is running.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::home::FleetHome;
use crate::schema::{self, Message};
use crate::watch::{WatchError, is_arrival_event, spawn_fs_watcher};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Settings for a [`MessageWatcher`].
#[derive(Debug, Clone)]
pub struct MessageWatcherConfig {
    /// Root of the message tree
    pub root: PathBuf,
    /// Only emit messages for this repository
    pub repo: Option<String>,
    /// Only emit messages for this agent
    pub agent: Option<String>,
}

impl MessageWatcherConfig {
    /// Settings for a message tree rooted at `root`, unscoped.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MessageWatcherConfig {
            root: root.into(),
            repo: None,
            agent: None,
        }
    }

    /// Settings for the message tree under a fleet home directory.
    pub fn for_home(home: &FleetHome) -> Self {
        MessageWatcherConfig::new(home.messages_root())
    }

    /// Restrict emissions to one repository.
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Restrict emissions to one agent.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// A message file located in the tree, with its position decoded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MessageRecord {
    /// Repository the message belongs to (grandparent directory)
    pub repo: String,
    /// Agent the message was delivered to (parent directory)
    pub agent: String,
    /// Full path of the message file
    pub path: PathBuf,
    /// Validated message content
    pub message: Message,
}

/// Notification delivered to [`MessageWatcher::subscribe`] receivers.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    /// A new in-scope message file appeared and validated.
    Received(MessageRecord),
    /// A new file appeared but could not be read or validated. The watch
    /// continues; only that file is affected.
    Error(WatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Watching,
    Closed,
}

/// Watches the message tree and emits newly arrived messages.
#[derive(Debug)]
pub struct MessageWatcher {
    config: MessageWatcherConfig,
    events: broadcast::Sender<MessageEvent>,
    phase: Phase,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MessageWatcher {
    /// Build a watcher in the idle phase; nothing is scanned or subscribed
    /// yet.
    pub fn new(config: MessageWatcherConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        MessageWatcher {
            config,
            events,
            phase: Phase::Idle,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Root of the watched message tree.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Whether the watcher is in the watching phase.
    pub fn is_watching(&self) -> bool {
        self.phase == Phase::Watching
    }

    /// Whether the watcher has been stopped.
    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Register for arrival and error notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.events.subscribe()
    }

    /// Baseline the existing tree, then watch for new files.
    ///
    /// The filesystem subscription is established before the baseline scan;
    /// files that land mid-scan show up both in the scan and as buffered
    /// notifications, and the seen set absorbs the overlap.
    ///
    /// # Errors
    ///
    /// [`WatchError::FileMissing`] if the message root does not exist (this
    /// watcher never creates it), [`WatchError::AlreadyWatching`] or
    /// [`WatchError::Closed`] on a phase violation, [`WatchError::Watch`] if
    /// the OS subscription fails.
    pub async fn start(&mut self) -> Result<(), WatchError> {
        match self.phase {
            Phase::Watching => return Err(WatchError::AlreadyWatching),
            Phase::Closed => return Err(WatchError::Closed),
            Phase::Idle => {}
        }

        let root = &self.config.root;
        if !root.is_dir() {
            return Err(WatchError::FileMissing(root.clone()));
        }

        let (watcher, fs_events) = spawn_fs_watcher(root, RecursiveMode::Recursive)?;

        let mut seen = HashSet::new();
        let files =
            list_message_files(root, self.config.repo.as_deref(), self.config.agent.as_deref())
                .await?;
        for (_, _, path) in files {
            seen.insert(path);
        }
        debug!(
            root = %root.display(),
            baseline = seen.len(),
            "message watcher started"
        );

        let task = WatcherTask {
            root: root.clone(),
            repo_scope: self.config.repo.clone(),
            agent_scope: self.config.agent.clone(),
            seen,
            events: self.events.clone(),
            cancel: self.cancel.clone(),
            fs_events,
            _watcher: watcher,
        };
        self.task = Some(tokio::spawn(task.run()));
        self.phase = Phase::Watching;
        Ok(())
    }

    /// Every message in scope whose acknowledged flag is not set.
    ///
    /// Walks the tree on demand; works in any phase and shares no state with
    /// the live watch. Unreadable and malformed files are skipped. A missing
    /// root reads as "no messages yet".
    pub async fn pending_messages(&self) -> Result<Vec<MessageRecord>, WatchError> {
        let files = list_message_files(
            &self.config.root,
            self.config.repo.as_deref(),
            self.config.agent.as_deref(),
        )
        .await?;

        let mut pending = Vec::new();
        for (repo, agent, path) in files {
            let message = match read_message(&path).await {
                Ok(message) => message,
                Err(err) => {
                    debug!(path = %path.display(), "skipping unreadable message file: {err}");
                    continue;
                }
            };
            if message.is_acknowledged() {
                continue;
            }
            pending.push(MessageRecord {
                repo,
                agent,
                path,
                message,
            });
        }
        Ok(pending)
    }

    /// Stop watching and release the filesystem subscription.
    ///
    /// Idempotent. After this resolves no further events are delivered; the
    /// seen set is discarded with the watch task. The watcher is closed for
    /// good.
    pub async fn stop(&mut self) {
        self.phase = Phase::Closed;
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MessageWatcher {
    fn drop(&mut self) {
        // Unblocks the watcher task if the owner never called stop.
        self.cancel.cancel();
    }
}

struct WatcherTask {
    root: PathBuf,
    repo_scope: Option<String>,
    agent_scope: Option<String>,
    seen: HashSet<PathBuf>,
    events: broadcast::Sender<MessageEvent>,
    cancel: CancellationToken,
    fs_events: mpsc::UnboundedReceiver<notify::Event>,
    // Dropping this releases the OS-level watch.
    _watcher: RecommendedWatcher,
}

impl WatcherTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("message watcher shutting down");
                    break;
                }
                event = self.fs_events.recv() => {
                    match event {
                        Some(event) => {
                            if is_arrival_event(&event) {
                                for path in event.paths {
                                    self.process_path(path).await;
                                }
                            }
                        }
                        None => {
                            let _ = self.events.send(MessageEvent::Error(WatchError::Watch(
                                "filesystem notification stream ended".to_string(),
                            )));
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn process_path(&mut self, path: PathBuf) {
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return;
        }
        let Some((repo, agent)) = split_repo_agent(&self.root, &path) else {
            return;
        };

        // Claim the path before any I/O so a duplicate notification for the
        // same file cannot race a slow read into double delivery.
        if !self.seen.insert(path.clone()) {
            return;
        }

        // Out-of-scope files are seen but never emitted.
        if self.repo_scope.as_deref().is_some_and(|scope| scope != repo) {
            return;
        }
        if self.agent_scope.as_deref().is_some_and(|scope| scope != agent) {
            return;
        }

        match read_message(&path).await {
            Ok(message) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                let _ = self.events.send(MessageEvent::Received(MessageRecord {
                    repo,
                    agent,
                    path,
                    message,
                }));
            }
            Err(WatchError::FileMissing(_)) => {
                // Deleted between the notification and the read; there is
                // nothing to deliver.
                debug!(path = %path.display(), "message file vanished before read");
            }
            Err(err) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                let _ = self.events.send(MessageEvent::Error(err));
            }
        }
    }
}

/// Repo and agent names from a message file's position in the tree.
///
/// Only exact-depth paths count: `<root>/<repo>/<agent>/<file>`. Anything
/// shallower or deeper is not a message file.
fn split_repo_agent(root: &Path, path: &Path) -> Option<(String, String)> {
    let rel = path.strip_prefix(root).ok()?;
    let components: Vec<_> = rel.components().collect();
    if components.len() != 3 {
        return None;
    }
    let repo = components[0].as_os_str().to_str()?.to_string();
    let agent = components[1].as_os_str().to_str()?.to_string();
    Some((repo, agent))
}

/// Enumerate message files under the (possibly scoped) tree.
///
/// A missing root or scope directory yields an empty list. Directories that
/// vanish mid-walk are skipped.
async fn list_message_files(
    root: &Path,
    repo_scope: Option<&str>,
    agent_scope: Option<&str>,
) -> Result<Vec<(String, String, PathBuf)>, WatchError> {
    let mut found = Vec::new();

    let Some(mut repo_dirs) = open_dir(root).await? else {
        return Ok(found);
    };
    while let Some(repo_entry) = next_entry(&mut repo_dirs).await? {
        let Ok(repo_name) = repo_entry.file_name().into_string() else {
            continue;
        };
        if repo_scope.is_some_and(|scope| scope != repo_name) {
            continue;
        }

        let Some(mut agent_dirs) = open_dir(&repo_entry.path()).await? else {
            continue;
        };
        while let Some(agent_entry) = next_entry(&mut agent_dirs).await? {
            let Ok(agent_name) = agent_entry.file_name().into_string() else {
                continue;
            };
            if agent_scope.is_some_and(|scope| scope != agent_name) {
                continue;
            }

            let Some(mut message_files) = open_dir(&agent_entry.path()).await? else {
                continue;
            };
            while let Some(file_entry) = next_entry(&mut message_files).await? {
                let path = file_entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    found.push((repo_name.clone(), agent_name.clone(), path));
                }
            }
        }
    }
    Ok(found)
}

/// `read_dir` that treats absence as "nothing there".
async fn open_dir(path: &Path) -> Result<Option<tokio::fs::ReadDir>, WatchError> {
    match tokio::fs::read_dir(path).await {
        Ok(dir) => Ok(Some(dir)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) if err.kind() == std::io::ErrorKind::NotADirectory => Ok(None),
        Err(err) => Err(WatchError::Io(err.to_string())),
    }
}

async fn next_entry(dir: &mut tokio::fs::ReadDir) -> Result<Option<tokio::fs::DirEntry>, WatchError> {
    dir.next_entry()
        .await
        .map_err(|err| WatchError::Io(err.to_string()))
}

async fn read_message(path: &Path) -> Result<Message, WatchError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::FileMissing(path.to_path_buf()));
        }
        Err(err) => return Err(WatchError::Io(err.to_string())),
    };

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|err| WatchError::Invalid(format!("message file is not valid JSON: {err}")))?;
    schema::parse_message(value).map_err(|err| WatchError::Invalid(err.to_string()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
