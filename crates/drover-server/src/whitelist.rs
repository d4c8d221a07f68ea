//! Whitelist reload driver
//!
//! Optional operator-maintained allow-list of `hostname:port` lines. A poll
//! loop re-reads the file and bulk-replaces the registry's active set when
//! the parsed contents change. The file is assumed durable at its source, so
//! no per-entry storage commits happen on reload.

use drover_registry::{Membership, NodeAddress, NodeRegistry, RegistryResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Parse whitelist file contents into a membership set
///
/// One `hostname:port` per line; blank lines and `#` comments are ignored.
///
/// # Errors
/// Returns the first address-parse error; a malformed file leaves membership
/// untouched rather than applying a partial set.
pub fn parse_whitelist(contents: &str) -> RegistryResult<Membership> {
    let mut set = Membership::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let addr: NodeAddress = line.parse()?;
        set.insert(&addr);
    }

    Ok(set)
}

/// Poll the whitelist file and keep the active set in sync
///
/// Runs until the process exits. Unreadable or malformed files are logged
/// and skipped; the last applied set stays in force.
pub async fn watch(registry: Arc<NodeRegistry>, path: PathBuf, poll_interval: Duration) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_applied: Option<Membership> = None;

    loop {
        interval.tick().await;

        match load(&path).await {
            Ok(desired) => {
                if last_applied.as_ref() == Some(&desired) {
                    debug!(path = %path.display(), "whitelist unchanged");
                    continue;
                }

                info!(
                    path = %path.display(),
                    size = desired.len(),
                    "whitelist changed, replacing active set"
                );
                registry.update_active(desired.clone()).await;
                last_applied = Some(desired);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "whitelist reload skipped");
            }
        }
    }
}

async fn load(path: &Path) -> anyhow::Result<Membership> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_whitelist(&contents)?)
}
