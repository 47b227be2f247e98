//! Repos command implementation

use anyhow::Result;
use clap::Args;

use super::{build_client, resolve_env};

/// List tracked repositories, or show one
#[derive(Args, Debug)]
pub struct ReposArgs {
    /// Show this repository in detail
    name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the repos command
pub async fn execute(args: ReposArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    let Some(name) = args.name else {
        let repos = client.list_repos().await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&repos)?);
        } else if repos.is_empty() {
            println!("No repositories tracked");
        } else {
            for repo in repos {
                println!("{repo}");
            }
        }
        return Ok(());
    };

    let repo = client.repo(&name).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&repo)?);
        return Ok(());
    }

    println!("{name}:");
    println!("  URL:          {}", repo.github_url);
    println!("  Tmux session: {}", repo.tmux_session);
    if let Some(branch) = &repo.target_branch {
        println!("  Target branch: {branch}");
    }
    println!("  Agents:       {}", repo.agents.len());
    if let Some(history) = &repo.task_history {
        println!("  Past tasks:   {}", history.len());
    }

    Ok(())
}
