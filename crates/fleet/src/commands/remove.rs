//! Remove command implementation

use anyhow::Result;
use clap::Args;

use super::{build_client, resolve_env};

/// Remove an agent
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Agent name
    name: String,

    /// Repository the agent belongs to (daemon's current repo when omitted)
    #[arg(long)]
    repo: Option<String>,
}

/// Execute the remove command
pub async fn execute(args: RemoveArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    client.remove_agent(&args.name, args.repo.as_deref()).await?;
    println!("Removed agent: {}", args.name);

    Ok(())
}
