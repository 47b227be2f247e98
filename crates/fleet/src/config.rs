//! Per-user settings loaded from `${FLEET_HOME}/config.toml`.
//!
//! The config file is optional. If it is absent or cannot be parsed, all
//! fields fall back to [`FleetConfig::default()`] and a warning goes to
//! stderr so formatting mistakes are diagnosable without breaking the CLI.
//!
//! # Example configuration
//!
//! ```toml
//! # ~/.fleet/config.toml
//! [daemon]
//! timeout_secs = 10    # per-call socket timeout
//!
//! [watch]
//! debounce_ms = 100    # quiet period before a state reload
//! ```

use std::time::Duration;

use agent_fleet_core::FleetHome;
use serde::Deserialize;

/// CLI runtime preferences, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FleetConfig {
    /// Socket client settings.
    #[serde(default)]
    pub daemon: DaemonSection,
    /// State watcher settings.
    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DaemonSection {
    /// Total budget in seconds for one daemon call. Defaults to `10`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchSection {
    /// Quiet period in milliseconds before a state reload. Defaults to `100`.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for DaemonSection {
    fn default() -> Self {
        DaemonSection {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        WatchSection {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl FleetConfig {
    /// Per-call socket timeout as a [`Duration`].
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.timeout_secs)
    }

    /// State reload debounce as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }
}

/// Load configuration from `{home}/config.toml`, falling back to defaults.
pub fn load_config(home: &FleetHome) -> FleetConfig {
    let path = home.config_path();
    if !path.exists() {
        return FleetConfig::default();
    }

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("fleet: warning: could not read {}: {err}", path.display());
            return FleetConfig::default();
        }
    };

    match toml::from_str::<FleetConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "fleet: warning: could not parse {}: {err}. Using defaults.",
                path.display()
            );
            FleetConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
