//! Messages command implementation - list and follow pending messages

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use agent_fleet_core::{MessageEvent, MessageRecord, MessageWatcher, MessageWatcherConfig};

/// Show or follow pending messages
#[derive(Args, Debug)]
pub struct MessagesArgs {
    /// Only messages under this repository
    #[arg(long)]
    repo: Option<String>,

    /// Only messages addressed to this agent
    #[arg(long)]
    agent: Option<String>,

    /// Keep running and print new messages as they arrive
    #[arg(short, long)]
    follow: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the messages command
pub async fn execute(args: MessagesArgs) -> Result<()> {
    let (home, _config) = super::resolve_env()?;

    let mut config = MessageWatcherConfig::for_home(&home);
    if let Some(repo) = &args.repo {
        config = config.with_repo(repo);
    }
    if let Some(agent) = &args.agent {
        config = config.with_agent(agent);
    }

    let mut watcher = MessageWatcher::new(config);

    // Subscribe before the initial listing so an arrival in between is
    // buffered rather than lost.
    let mut events = watcher.subscribe();
    if args.follow {
        if !watcher.root().is_dir() {
            anyhow::bail!(
                "no messages directory at {} (is fleetd running?)",
                watcher.root().display()
            );
        }
        watcher.start().await?;
    }

    let pending = watcher.pending_messages().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
    } else if pending.is_empty() {
        println!("No pending messages");
    } else {
        for record in &pending {
            print_record(record);
        }
        println!("Total: {} message(s)", pending.len());
    }

    if !args.follow {
        return Ok(());
    }

    eprintln!("Watching for new messages (Ctrl+C to stop)...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(MessageEvent::Received(record)) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&record)?);
                    } else {
                        print_record(&record);
                    }
                }
                Ok(MessageEvent::Error(err)) => {
                    eprintln!("fleet: watch error: {err}");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "missed message events while printing");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    watcher.stop().await;

    Ok(())
}

/// Print one message as a single scannable line.
fn print_record(record: &MessageRecord) {
    let when = format_relative_time(&record.message.created_at);
    println!(
        "[{when}] {}/{}  {} -> {}: {}",
        record.repo,
        record.agent,
        record.message.from,
        record.message.to,
        super::truncate(&record.message.content, 80),
    );
}

/// Format a timestamp as relative time (e.g., "2m ago", "1h ago")
fn format_relative_time(ts: &DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(*ts);

    if duration.num_seconds() < 0 {
        "in the future".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else {
        format!("{}d ago", duration.num_days())
    }
}
