//! CLI command dispatch and execution

use anyhow::Result;
use clap::{Parser, Subcommand};

use agent_fleet_core::{ClientConfig, DaemonClient, FleetHome};

use crate::config::{FleetConfig, load_config};

mod agents;
mod daemon;
mod history;
mod messages;
mod remove;
mod repos;
mod send;
mod spawn;
mod status;
mod watch;
mod workers;

/// fleet - inspect and control the fleetd agent daemon
#[derive(Parser, Debug)]
#[command(
    name = "fleet",
    version,
    about = "Inspect and control the fleetd agent daemon",
    long_about = "A thin CLI over the fleetd daemon socket and the state and \
                  message files it maintains under ~/.fleet/"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show daemon status
    Status(status::StatusArgs),

    /// List agents from the mirrored state
    Agents(agents::AgentsArgs),

    /// List running workers
    Workers(workers::WorkersArgs),

    /// Spawn a worker for a task
    Spawn(spawn::SpawnArgs),

    /// Remove an agent
    Remove(remove::RemoveArgs),

    /// List tracked repositories, or show one
    Repos(repos::ReposArgs),

    /// Show completed task history
    History(history::HistoryArgs),

    /// Send a message to an agent
    Send(send::SendArgs),

    /// Show or follow pending messages
    Messages(messages::MessagesArgs),

    /// Follow state changes live
    Watch(watch::WatchArgs),

    /// Daemon lifecycle commands
    Daemon(daemon::DaemonArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Status(args) => status::execute(args).await,
            Commands::Agents(args) => agents::execute(args).await,
            Commands::Workers(args) => workers::execute(args).await,
            Commands::Spawn(args) => spawn::execute(args).await,
            Commands::Remove(args) => remove::execute(args).await,
            Commands::Repos(args) => repos::execute(args).await,
            Commands::History(args) => history::execute(args).await,
            Commands::Send(args) => send::execute(args).await,
            Commands::Messages(args) => messages::execute(args).await,
            Commands::Watch(args) => watch::execute(args).await,
            Commands::Daemon(args) => daemon::execute(args).await,
        }
    }
}

/// Resolve the fleet home and user config together; most commands start here.
fn resolve_env() -> Result<(FleetHome, FleetConfig)> {
    let home = FleetHome::resolve()?;
    let config = load_config(&home);
    Ok((home, config))
}

/// Client for the daemon socket under the resolved fleet home.
fn build_client(home: &FleetHome, config: &FleetConfig) -> DaemonClient {
    DaemonClient::new(
        ClientConfig::new(home.socket_path()).with_timeout(config.client_timeout()),
    )
}

/// Clip long free text for one-line table output.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max_chars).collect();
        format!("{clipped}...")
    }
}
