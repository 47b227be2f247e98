//! Send command implementation

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{build_client, resolve_env};

/// Send a message to an agent
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Recipient agent name
    to: String,

    /// Message text
    message: String,

    /// Sender identity
    #[arg(long, default_value = "human")]
    from: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the send command
pub async fn execute(args: SendArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    let id = client
        .send_message(&args.to, &args.message, &args.from)
        .await?;

    if args.json {
        println!("{}", json!({ "id": id, "to": args.to }));
    } else {
        println!("Sent message {id} to {}", args.to);
    }

    Ok(())
}
