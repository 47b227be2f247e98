//! Spawn command implementation

use agent_fleet_core::SpawnRequest;
use anyhow::Result;
use clap::Args;

use super::{build_client, resolve_env};

/// Spawn a worker for a task
#[derive(Args, Debug)]
pub struct SpawnArgs {
    /// Task description handed to the worker
    task: String,

    /// Repository to spawn in (daemon's current repo when omitted)
    #[arg(long)]
    repo: Option<String>,

    /// Branch to base the work on
    #[arg(long)]
    branch: Option<String>,

    /// Remote to push the finished branch to
    #[arg(long)]
    push_to: Option<String>,
}

/// Execute the spawn command
pub async fn execute(args: SpawnArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    let spawn = SpawnRequest {
        task: args.task,
        repo: args.repo,
        branch: args.branch,
        push_to: args.push_to,
    };
    let name = client.spawn_worker(&spawn).await?;
    println!("Spawned worker: {name}");

    Ok(())
}
