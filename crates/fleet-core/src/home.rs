//! Fleet home directory resolution
//!
//! Everything the daemon shares with its clients lives under one directory,
//! `~/.fleet` by default: the control socket, the state file, and the message
//! tree. [`FleetHome`] resolves that root once at startup and derives the
//! well-known paths; components receive the derived paths explicitly and
//! never consult the environment themselves.
//!
//! # Precedence
//!
//! 1. `FLEET_HOME` environment variable, if set and non-empty, used as the
//!    root directly
//! 2. `dirs::home_dir()/.fleet` platform default

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resolved root of the daemon's on-disk contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetHome {
    root: PathBuf,
}

impl FleetHome {
    /// Resolve the fleet home from the environment.
    ///
    /// # Errors
    ///
    /// Fails only when `FLEET_HOME` is unset and the platform home directory
    /// cannot be determined.
    pub fn resolve() -> Result<Self> {
        if let Ok(home) = std::env::var("FLEET_HOME") {
            let trimmed = home.trim();
            if !trimmed.is_empty() {
                return Ok(FleetHome {
                    root: PathBuf::from(trimmed),
                });
            }
        }

        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(FleetHome {
            root: home.join(".fleet"),
        })
    }

    /// Use an explicit root, bypassing environment resolution.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        FleetHome { root: root.into() }
    }

    /// The resolved root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Control socket the daemon listens on.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join("daemon.sock")
    }

    /// Atomically-rewritten global state snapshot.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Root of the `<repo>/<agent>/<message-id>.json` message tree.
    pub fn messages_root(&self) -> PathBuf {
        self.root.join("messages")
    }

    /// Optional client-side configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
