//! Debounced mirror of the daemon's state file.
//!
//! The daemon rewrites `${FLEET_HOME}/state.json` atomically whenever agents,
//! repositories, or tasks change. [`StateWatcher`] keeps an in-memory copy in
//! sync: filesystem notifications restart a short debounce timer, and when the
//! timer expires the file is re-read, validated, and swapped in wholesale. A
//! burst of rapid rewrites therefore collapses into a single reload carrying
//! the final content.
//!
//! A reload that fails validation never replaces the cached snapshot; the
//! stale-but-valid copy is kept and the failure goes out as
//! [`StateEvent::Error`]. The watcher is long-lived and survives bad reads;
//! the subscriber decides whether a failure is worth stopping over.
//!
//! Lifecycle is one-way: idle until [`StateWatcher::start`], watching until
//! [`StateWatcher::stop`], then closed for good. A closed watcher cannot be
//! restarted; construct a new one.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::home::FleetHome;
use crate::schema::{self, State};
use crate::watch::{WatchError, event_touches, is_content_event, spawn_fs_watcher};

/// Debounce window applied when [`StateWatcherConfig`] does not override it.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Settings for a [`StateWatcher`].
#[derive(Debug, Clone)]
pub struct StateWatcherConfig {
    /// State file to mirror
    pub path: PathBuf,
    /// Quiet period required after the last notification before reloading
    pub debounce: Duration,
}

impl StateWatcherConfig {
    /// Settings for a state file at `path` with the default debounce.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateWatcherConfig {
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Settings for the state file under a fleet home directory.
    pub fn for_home(home: &FleetHome) -> Self {
        StateWatcherConfig::new(home.state_path())
    }

    /// Override the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Notification delivered to [`StateWatcher::subscribe`] receivers.
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// The cached snapshot was replaced after a successful reload.
    Changed(State),
    /// A reload failed; the previous snapshot is retained.
    Error(WatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Watching,
    Closed,
}

#[derive(Debug)]
enum Control {
    Reload(oneshot::Sender<Result<State, WatchError>>),
}

/// Watches one state file and mirrors it into memory.
#[derive(Debug)]
pub struct StateWatcher {
    config: StateWatcherConfig,
    snapshot: Arc<Mutex<Option<State>>>,
    events: broadcast::Sender<StateEvent>,
    phase: Phase,
    cancel: CancellationToken,
    control: Option<mpsc::Sender<Control>>,
    task: Option<JoinHandle<()>>,
}

impl StateWatcher {
    /// Build a watcher in the idle phase; nothing is read or subscribed yet.
    pub fn new(config: StateWatcherConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        StateWatcher {
            config,
            snapshot: Arc::new(Mutex::new(None)),
            events,
            phase: Phase::Idle,
            cancel: CancellationToken::new(),
            control: None,
            task: None,
        }
    }

    /// Path of the mirrored state file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Whether the state file currently exists.
    pub fn exists(&self) -> bool {
        self.config.path.exists()
    }

    /// Whether the watcher is in the watching phase.
    pub fn is_watching(&self) -> bool {
        self.phase == Phase::Watching
    }

    /// Whether the watcher has been stopped.
    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// The most recent successfully validated state, if any reload has
    /// succeeded yet.
    pub fn snapshot(&self) -> Option<State> {
        self.snapshot.lock().unwrap().clone()
    }

    /// Register for change and error notifications.
    ///
    /// May be called in any phase and from multiple subscribers; each
    /// receiver sees every event sent after its registration. Subscribe
    /// before [`StateWatcher::start`] to also catch the initial load.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Read and validate the file directly, bypassing the cache.
    pub async fn read(&self) -> Result<State, WatchError> {
        load_state(&self.config.path).await
    }

    /// Like [`StateWatcher::read`], but a missing file yields an empty state
    /// instead of an error.
    pub async fn read_or_empty(&self) -> Result<State, WatchError> {
        match load_state(&self.config.path).await {
            Err(WatchError::FileMissing(_)) => Ok(State::default()),
            other => other,
        }
    }

    /// Begin watching: one awaited load of the current content, then
    /// subscribe to filesystem notifications.
    ///
    /// A missing file is not an error at this point; the watcher starts with
    /// an empty cache and picks the file up when it appears. Invalid content
    /// is reported through the event channel and the watcher starts anyway.
    ///
    /// # Errors
    ///
    /// [`WatchError::AlreadyWatching`] or [`WatchError::Closed`] on a phase
    /// violation, [`WatchError::Watch`] if the OS subscription cannot be
    /// established (the watcher stays idle).
    pub async fn start(&mut self) -> Result<(), WatchError> {
        match self.phase {
            Phase::Watching => return Err(WatchError::AlreadyWatching),
            Phase::Closed => return Err(WatchError::Closed),
            Phase::Idle => {}
        }

        match load_state(&self.config.path).await {
            Ok(state) => {
                *self.snapshot.lock().unwrap() = Some(state.clone());
                let _ = self.events.send(StateEvent::Changed(state));
            }
            Err(WatchError::FileMissing(_)) => {
                debug!("state file absent at watch start; starting with empty cache");
            }
            Err(err) => {
                let _ = self.events.send(StateEvent::Error(err));
            }
        }

        // Watch the parent directory; the file itself may not exist yet, and
        // atomic rewrites replace the inode anyway.
        let watch_dir = self.config.path.parent().unwrap_or(Path::new("."));
        let (watcher, fs_events) = spawn_fs_watcher(watch_dir, RecursiveMode::NonRecursive)?;

        let (control_tx, control_rx) = mpsc::channel(8);
        let task = WatcherTask {
            path: self.config.path.clone(),
            debounce: self.config.debounce,
            snapshot: Arc::clone(&self.snapshot),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
            fs_events,
            control: control_rx,
            _watcher: watcher,
        };
        self.task = Some(tokio::spawn(task.run()));
        self.control = Some(control_tx);
        self.phase = Phase::Watching;
        debug!(path = %self.config.path.display(), "state watcher started");
        Ok(())
    }

    /// Reload the file now instead of waiting for a notification.
    ///
    /// While watching, the reload runs inside the watcher task, so it cancels
    /// any pending debounce timer it supersedes and emits the same events a
    /// debounced reload would. While idle it only refreshes the cache.
    pub async fn reload(&self) -> Result<State, WatchError> {
        match self.phase {
            Phase::Closed => Err(WatchError::Closed),
            Phase::Idle => {
                let state = load_state(&self.config.path).await?;
                *self.snapshot.lock().unwrap() = Some(state.clone());
                Ok(state)
            }
            Phase::Watching => {
                let control = self.control.as_ref().ok_or(WatchError::Closed)?;
                let (reply_tx, reply_rx) = oneshot::channel();
                control
                    .send(Control::Reload(reply_tx))
                    .await
                    .map_err(|_| WatchError::Closed)?;
                reply_rx.await.map_err(|_| WatchError::Closed)?
            }
        }
    }

    /// Stop watching and release the filesystem subscription.
    ///
    /// Idempotent. After this resolves no further events are delivered; a
    /// reload that was mid-flight when stop was called is discarded. The
    /// watcher is closed for good.
    pub async fn stop(&mut self) {
        self.phase = Phase::Closed;
        self.cancel.cancel();
        self.control = None;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StateWatcher {
    fn drop(&mut self) {
        // Unblocks the watcher task if the owner never called stop.
        self.cancel.cancel();
    }
}

struct WatcherTask {
    path: PathBuf,
    debounce: Duration,
    snapshot: Arc<Mutex<Option<State>>>,
    events: broadcast::Sender<StateEvent>,
    cancel: CancellationToken,
    fs_events: mpsc::UnboundedReceiver<notify::Event>,
    control: mpsc::Receiver<Control>,
    // Dropping this releases the OS-level watch.
    _watcher: RecommendedWatcher,
}

impl WatcherTask {
    async fn run(mut self) {
        // The timer is the single authority for "a reload is due": every
        // relevant notification restarts it, and a manual reload clears it.
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_target = deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("state watcher shutting down");
                    break;
                }
                event = self.fs_events.recv() => {
                    match event {
                        Some(event) => {
                            if is_content_event(&event) && event_touches(&event, &self.path) {
                                deadline = Some(Instant::now() + self.debounce);
                            }
                        }
                        None => {
                            let _ = self.events.send(StateEvent::Error(WatchError::Watch(
                                "filesystem notification stream ended".to_string(),
                            )));
                            break;
                        }
                    }
                }
                control = self.control.recv() => {
                    match control {
                        Some(Control::Reload(reply)) => {
                            deadline = None;
                            let result = self.load_and_publish().await;
                            let _ = reply.send(result);
                        }
                        // Owner dropped without stopping; wind down.
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                    deadline = None;
                    let _ = self.load_and_publish().await;
                }
            }
        }
    }

    async fn load_and_publish(&self) -> Result<State, WatchError> {
        let result = load_state(&self.path).await;

        // A stop that arrived while the read was in flight wins: the result
        // is discarded without touching the cache or emitting.
        if self.cancel.is_cancelled() {
            return Err(WatchError::Closed);
        }

        match result {
            Ok(state) => {
                *self.snapshot.lock().unwrap() = Some(state.clone());
                let _ = self.events.send(StateEvent::Changed(state.clone()));
                Ok(state)
            }
            Err(err) => {
                let _ = self.events.send(StateEvent::Error(err.clone()));
                Err(err)
            }
        }
    }
}

async fn load_state(path: &Path) -> Result<State, WatchError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::FileMissing(path.to_path_buf()));
        }
        Err(err) => return Err(WatchError::Io(err.to_string())),
    };

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|err| WatchError::Invalid(format!("state file is not valid JSON: {err}")))?;
    schema::parse_state(value).map_err(|err| WatchError::Invalid(err.to_string()))
}

// ── Tests ────────────────────────────────────────────────────────────────────
