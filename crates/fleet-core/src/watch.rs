//! Shared plumbing for the filesystem watchers.
//!
//! Both watchers bridge [`notify`]'s callback API into tokio with an unbounded
//! channel: the notify callback runs on the OS watcher thread, where
//! `UnboundedSender::send` is safe to call, and the watcher task receives the
//! events inside its `select!` loop. The returned [`RecommendedWatcher`] must
//! stay alive for as long as events are wanted; dropping it releases the
//! OS-level watch.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Failure surfaced by a watcher, either from an accessor or carried in an
/// error event.
///
/// Cloneable so the same failure can be fanned out to every subscriber, which
/// means I/O and watch errors are carried as rendered strings rather than
/// source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchError {
    /// The watched file does not exist. Distinct from [`WatchError::Invalid`]:
    /// "no state yet" is not corruption.
    #[error("file not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// The file exists but its content failed to parse or validate.
    #[error("invalid content: {0}")]
    Invalid(String),

    /// Reading the file failed for a reason other than absence.
    #[error("read failed: {0}")]
    Io(String),

    /// The OS notification mechanism could not be set up or stopped working.
    #[error("filesystem watch failed: {0}")]
    Watch(String),

    /// The watcher was started twice.
    #[error("watcher is already running")]
    AlreadyWatching,

    /// The watcher was stopped; it cannot be restarted.
    #[error("watcher is closed")]
    Closed,
}

/// Subscribe `path` to OS file notifications, forwarded into a tokio channel.
///
/// The notify callback drops nothing silently: watch-backend errors are logged
/// since they carry no actionable path info, and events always forward.
pub(crate) fn spawn_fs_watcher(
    path: &Path,
    mode: RecursiveMode,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<notify::Event>), WatchError> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => warn!("filesystem watch backend error: {err}"),
        }
    })
    .map_err(|err| WatchError::Watch(format!("failed to create watcher: {err}")))?;

    watcher
        .watch(path, mode)
        .map_err(|err| WatchError::Watch(format!("failed to watch {}: {err}", path.display())))?;

    Ok((watcher, rx))
}

/// Whether a notify event describes content appearing or changing.
///
/// Metadata-only modifications are ignored; removals are included because a
/// watched file disappearing is a content change the watchers must observe.
pub(crate) fn is_content_event(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(notify::event::ModifyKind::Data(_))
            | EventKind::Modify(notify::event::ModifyKind::Any)
            | EventKind::Modify(notify::event::ModifyKind::Other)
            | EventKind::Modify(notify::event::ModifyKind::Name(_))
            | EventKind::Remove(_)
    )
}

/// Whether a notify event can describe a file arriving.
///
/// Like [`is_content_event`] minus removals: a deleted message file is an
/// acknowledgement, not an arrival.
pub(crate) fn is_arrival_event(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(notify::event::ModifyKind::Data(_))
            | EventKind::Modify(notify::event::ModifyKind::Any)
            | EventKind::Modify(notify::event::ModifyKind::Other)
            | EventKind::Modify(notify::event::ModifyKind::Name(_))
    )
}

/// Whether any of the event's paths refer to `target`.
///
/// Compares by full path first, then by file name, which covers platforms
/// that report canonicalized paths (macOS `/var` vs `/private/var`).
pub(crate) fn event_touches(event: &notify::Event, target: &Path) -> bool {
    if event.paths.is_empty() {
        // No path info; process conservatively.
        return true;
    }
    let target_name = target.file_name();
    event.paths.iter().any(|path| {
        path == target || (path.file_name().is_some() && path.file_name() == target_name)
    })
}
