//! Server configuration
//!
//! Explicit configuration with bounded defaults, supplied once at startup.

use drover_registry::COMMIT_TIMEOUT_MS_DEFAULT;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default whitelist poll interval in milliseconds
pub const WHITELIST_POLL_INTERVAL_MS_DEFAULT: u64 = 5_000;

/// Default transition-log path
pub const STORAGE_PATH_DEFAULT: &str = "drover-transitions.log";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    /// Path of the transition log
    pub storage_path: PathBuf,
    /// Bound on each storage commit await, in milliseconds
    pub commit_timeout_ms: u64,
    /// Optional whitelist file; when set, the active set tracks its contents
    pub whitelist: Option<PathBuf>,
    /// Whitelist poll interval in milliseconds
    pub whitelist_poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5050".parse().expect("valid default bind"),
            storage_path: PathBuf::from(STORAGE_PATH_DEFAULT),
            commit_timeout_ms: COMMIT_TIMEOUT_MS_DEFAULT,
            whitelist: None,
            whitelist_poll_interval_ms: WHITELIST_POLL_INTERVAL_MS_DEFAULT,
        }
    }
}

impl ServerConfig {
    /// Create a configuration bound to the given address
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Default::default()
        }
    }

    /// Set the transition-log path
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Set the commit timeout
    pub fn with_commit_timeout(mut self, timeout_ms: u64) -> Self {
        self.commit_timeout_ms = timeout_ms;
        self
    }

    /// Track a whitelist file
    pub fn with_whitelist(mut self, path: impl Into<PathBuf>) -> Self {
        self.whitelist = Some(path.into());
        self
    }

    /// Set the whitelist poll interval
    pub fn with_whitelist_poll_interval(mut self, interval_ms: u64) -> Self {
        self.whitelist_poll_interval_ms = interval_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.commit_timeout_ms, COMMIT_TIMEOUT_MS_DEFAULT);
        assert!(config.whitelist.is_none());
    }

    #[test]
    fn test_builders() {
        let config = ServerConfig::new("0.0.0.0:5050".parse().unwrap())
            .with_storage_path("/var/lib/drover/log")
            .with_commit_timeout(1_000)
            .with_whitelist("/etc/drover/whitelist")
            .with_whitelist_poll_interval(250);

        assert_eq!(config.commit_timeout_ms, 1_000);
        assert_eq!(config.whitelist_poll_interval_ms, 250);
        assert_eq!(
            config.whitelist.as_deref(),
            Some(std::path::Path::new("/etc/drover/whitelist"))
        );
    }
}
