//! Agents command implementation

use std::collections::BTreeMap;

use agent_fleet_core::{Repository, StateWatcher, StateWatcherConfig};
use anyhow::Result;
use clap::Args;

use super::{resolve_env, truncate};

/// List agents from the mirrored state
#[derive(Args, Debug)]
pub struct AgentsArgs {
    /// Only this repository
    #[arg(long)]
    repo: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the agents command
///
/// Reads the state file directly rather than asking the daemon, so it works
/// while the daemon is busy or down.
pub async fn execute(args: AgentsArgs) -> Result<()> {
    let (home, _config) = resolve_env()?;

    let watcher = StateWatcher::new(StateWatcherConfig::for_home(&home));
    if !watcher.exists() {
        anyhow::bail!(
            "no state file at {} (is fleetd running?)",
            watcher.path().display()
        );
    }
    let state = watcher.read().await?;

    let repos: BTreeMap<&String, &Repository> = state
        .repos
        .iter()
        .filter(|(name, _)| args.repo.as_ref().is_none_or(|repo| repo == *name))
        .collect();

    if let Some(repo) = &args.repo
        && repos.is_empty()
    {
        anyhow::bail!("repository '{repo}' is not tracked");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    if repos.is_empty() {
        println!("No repositories tracked");
        return Ok(());
    }

    for (repo_name, repo) in repos {
        println!("\n{repo_name}:");
        if repo.agents.is_empty() {
            println!("  (no agents)");
            continue;
        }
        for (agent_name, agent) in &repo.agents {
            let running = if agent.is_running() { "running" } else { "stopped" };
            let task_info = agent
                .task
                .as_deref()
                .map(|task| format!(" - {}", truncate(task, 50)))
                .unwrap_or_default();
            println!("  {agent_name} ({}) [{running}]{task_info}", agent.kind);
        }
    }

    Ok(())
}
