//! Watch command implementation - follow state changes live

use anyhow::Result;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use agent_fleet_core::{StateEvent, StateWatcher, StateWatcherConfig};

/// Follow state changes live
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Print each state snapshot as a JSON line
    #[arg(long)]
    json: bool,
}

/// Execute the watch command
pub async fn execute(args: WatchArgs) -> Result<()> {
    let (home, config) = super::resolve_env()?;

    let watcher_config =
        StateWatcherConfig::for_home(&home).with_debounce(config.debounce());
    let mut watcher = StateWatcher::new(watcher_config);

    // Subscribe first so the initial snapshot emitted by start() is the
    // first line of output.
    let mut events = watcher.subscribe();
    watcher.start().await?;

    eprintln!("Watching for state changes (Ctrl+C to stop)...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StateEvent::Changed(state)) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&state)?);
                    } else {
                        println!(
                            "State updated: {} repos, {} active workers",
                            state.repos.len(),
                            state.active_workers().count()
                        );
                    }
                }
                Ok(StateEvent::Error(err)) => {
                    eprintln!("fleet: reload failed: {err}");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "missed state events while printing");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    watcher.stop().await;
    println!("Stopped");

    Ok(())
}
