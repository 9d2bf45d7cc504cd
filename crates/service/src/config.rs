//! Configuration surface and state-history directory preparation.

use clap::Parser;
use std::{
    fs,
    net::SocketAddr,
    path::PathBuf,
};

/// Default endpoint the service listens on.
pub(crate) const DEFAULT_ENDPOINT: &str = "0.0.0.0:8080";

/// CLI arguments for the state history service.
#[derive(Parser, Debug, Clone)]
pub struct StateHistoryArgs {
    /// The location of the state-history directory (absolute path or
    /// relative to the application data dir).
    #[arg(
        long = "state-history-dir",
        default_value = "state-history",
        env = "SCRIBE_STATE_HISTORY_DIR",
        help = "The location of the state-history directory (absolute path or relative to application data dir)"
    )]
    pub state_history_dir: PathBuf,
    /// Clear the state history database on startup.
    #[arg(
        long = "delete-state-history",
        default_value_t = false,
        help = "Clear state history database"
    )]
    pub delete_state_history: bool,
    /// The endpoint upon which to listen for incoming connections.
    #[arg(
        long = "state-history-endpoint",
        default_value = DEFAULT_ENDPOINT,
        env = "SCRIBE_STATE_HISTORY_ENDPOINT",
        help = "The endpoint upon which to listen for incoming connections"
    )]
    pub endpoint: SocketAddr,
}

impl StateHistoryArgs {
    /// Resolves the arguments into a runtime configuration, anchoring a
    /// relative directory at `data_dir`.
    pub fn config(&self, data_dir: impl Into<PathBuf>) -> StateHistoryConfig {
        StateHistoryConfig {
            state_history_dir: self.state_history_dir.clone(),
            delete_state_history: self.delete_state_history,
            endpoint: self.endpoint,
            data_dir: data_dir.into(),
        }
    }
}

/// Runtime configuration for the state history service.
#[derive(Debug, Clone)]
pub struct StateHistoryConfig {
    /// Directory holding the six log/index files. A relative path resolves
    /// against `data_dir`.
    pub state_history_dir: PathBuf,
    /// Remove existing directory contents before opening.
    pub delete_state_history: bool,
    /// Endpoint to listen on.
    pub endpoint: SocketAddr,
    /// Application data directory.
    pub data_dir: PathBuf,
}

impl StateHistoryConfig {
    /// The fully resolved state-history directory.
    pub fn resolved_dir(&self) -> PathBuf {
        if self.state_history_dir.is_relative() {
            self.data_dir.join(&self.state_history_dir)
        } else {
            self.state_history_dir.clone()
        }
    }
}

/// Resolves, optionally wipes, and creates the state-history directory.
pub fn prepare_state_history_dir(config: &StateHistoryConfig) -> std::io::Result<PathBuf> {
    let dir = config.resolved_dir();
    if config.delete_state_history && dir.exists() {
        info!(target: "state_history", dir = %dir.display(), "deleting state history");
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
