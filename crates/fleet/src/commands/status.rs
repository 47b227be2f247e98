//! Status command implementation

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{build_client, resolve_env};

/// Show daemon status
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the status command
pub async fn execute(args: StatusArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    if !client.ping().await {
        if args.json {
            println!("{}", json!({ "running": false }));
        } else {
            eprintln!(
                "fleetd is not running (no answer at {})",
                client.socket_path().display()
            );
        }
        std::process::exit(1);
    }

    let status = client.status().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fleetd running (PID: {})", status.pid);
        println!("  Repositories: {}", status.repos);
        println!("  Agents:       {}", status.agents);
        println!("  Socket:       {}", status.socket_path);
    }

    Ok(())
}
