//! Shared logging initialization for fleet binaries.
//!
//! Diagnostics go to stderr so command output on stdout stays parseable.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

fn parse_level() -> tracing::Level {
    match std::env::var("FLEET_LOG")
        .unwrap_or_else(|_| "warn".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    }
}

/// Initialize process-level tracing output from `FLEET_LOG`.
///
/// Safe to call multiple times; only the first call installs the subscriber.
/// Best-effort, never returns an error.
pub fn init() {
    init_with_level(None);
}

/// Initialize with an explicit maximum level, overriding `FLEET_LOG`.
pub fn init_with_level(level: Option<tracing::Level>) {
    if INIT.get().is_some() {
        return;
    }
    let level = level.unwrap_or_else(parse_level);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}
