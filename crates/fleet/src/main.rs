//! fleet - CLI for the fleetd agent daemon
//!
//! A thin CLI over the daemon's Unix socket and the files it maintains under
//! `~/.fleet/`. Control commands (spawn, remove, send, daemon) talk to the
//! socket; inspection commands (agents, workers, watch, messages) read the
//! state file and message tree directly so they work even while the daemon
//! is busy or down.

use clap::Parser;

mod commands;
mod config;

use commands::Cli;

#[tokio::main]
async fn main() {
    agent_fleet_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
