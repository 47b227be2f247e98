//! History command implementation

use agent_fleet_core::TaskStatus;
use anyhow::Result;
use clap::Args;

use super::{build_client, resolve_env, truncate};

/// Show completed task history
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only this repository
    #[arg(long)]
    repo: Option<String>,

    /// Most recent N entries
    #[arg(long)]
    limit: Option<usize>,

    /// Filter by status (open, merged, closed, no-pr, failed, unknown)
    #[arg(long)]
    status: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the history command
pub async fn execute(args: HistoryArgs) -> Result<()> {
    let (home, config) = resolve_env()?;
    let client = build_client(&home, &config);

    let status = args.status.as_deref().map(parse_status).transpose()?;
    let entries = client
        .task_history(args.repo.as_deref(), args.limit, status)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No task history");
        return Ok(());
    }

    for entry in entries {
        let when = entry.created_at.format("%Y-%m-%d");
        let pr = entry
            .pr_url
            .as_deref()
            .map(|url| format!("  {url}"))
            .unwrap_or_default();
        println!(
            "{when}  {:<8} {:<20} {}{pr}",
            entry.status.as_str(),
            entry.name,
            truncate(&entry.task, 60),
        );
    }

    Ok(())
}

/// Map a user-supplied status word through the same vocabulary the wire uses.
fn parse_status(word: &str) -> Result<TaskStatus> {
    serde_json::from_value(serde_json::Value::String(word.to_string())).map_err(|_| {
        anyhow::anyhow!(
            "unknown status '{word}' (expected open, merged, closed, no-pr, failed, or unknown)"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_wire_words() {
        assert_eq!(parse_status("merged").unwrap(), TaskStatus::Merged);
        assert_eq!(parse_status("no-pr").unwrap(), TaskStatus::NoPr);
    }

    #[test]
    fn test_parse_status_rejects_unknown_words() {
        let err = parse_status("finished").unwrap_err();
        assert!(err.to_string().contains("unknown status 'finished'"));
    }
}
