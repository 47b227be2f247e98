//! Workers command implementation

use agent_fleet_core::{StateWatcher, StateWatcherConfig};
use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{resolve_env, truncate};

/// List running workers
#[derive(Args, Debug)]
pub struct WorkersArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the workers command
pub async fn execute(args: WorkersArgs) -> Result<()> {
    let (home, _config) = resolve_env()?;

    let watcher = StateWatcher::new(StateWatcherConfig::for_home(&home));
    if !watcher.exists() {
        anyhow::bail!(
            "no state file at {} (is fleetd running?)",
            watcher.path().display()
        );
    }
    let state = watcher.read().await?;
    let workers: Vec<_> = state.active_workers().collect();

    if args.json {
        let output: Vec<_> = workers
            .iter()
            .map(|(repo, name, agent)| {
                json!({
                    "repo": repo,
                    "name": name,
                    "task": agent.task,
                    "created_at": agent.created_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if workers.is_empty() {
        println!("No active workers");
        return Ok(());
    }

    println!("Active workers: {}\n", workers.len());
    for (repo, name, agent) in workers {
        println!("  {name} ({repo})");
        if let Some(task) = &agent.task {
            println!("    Task: {}", truncate(task, 60));
        }
    }

    Ok(())
}
