//! Daemon command implementation - lifecycle operations over the socket

use anyhow::Result;
use clap::{Args, Subcommand};

/// Daemon lifecycle commands
#[derive(Args, Debug)]
pub struct DaemonArgs {
    #[command(subcommand)]
    command: DaemonCommands,
}

#[derive(Subcommand, Debug)]
enum DaemonCommands {
    /// Check whether the daemon answers on its socket
    Ping,

    /// Ask the daemon to shut down
    Stop,

    /// Sweep settled workers
    Cleanup,

    /// Route queued messages now
    Route,
}

/// Execute the daemon command
pub async fn execute(args: DaemonArgs) -> Result<()> {
    let (home, config) = super::resolve_env()?;
    let client = super::build_client(&home, &config);

    match args.command {
        DaemonCommands::Ping => {
            if client.ping().await {
                println!("pong");
            } else {
                eprintln!(
                    "fleetd is not responding at {}",
                    client.socket_path().display()
                );
                std::process::exit(1);
            }
        }
        DaemonCommands::Stop => {
            client.stop().await?;
            println!("Daemon stopping");
        }
        DaemonCommands::Cleanup => {
            client.cleanup().await?;
            println!("Cleanup triggered");
        }
        DaemonCommands::Route => {
            client.route_messages().await?;
            println!("Message routing triggered");
        }
    }

    Ok(())
}
