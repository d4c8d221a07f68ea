//! Drover server binary
//!
//! Wires the pieces together: storage recovery, registry construction,
//! whitelist watcher, membership event log, HTTP serving.

use anyhow::Context;
use clap::Parser;
use drover_registry::{FileStorage, MembershipEvent, NodeRegistry};
use drover_server::{api, whitelist, AppState, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Drover node-registry server CLI
#[derive(Parser, Debug)]
#[command(name = "drover-server")]
#[command(about = "Control-plane node registry for cluster workers")]
#[command(version)]
struct Cli {
    /// HTTP bind address
    #[arg(short, long, default_value = "127.0.0.1:5050")]
    bind: SocketAddr,

    /// Transition-log path
    #[arg(short, long, default_value = drover_server::config::STORAGE_PATH_DEFAULT)]
    storage: PathBuf,

    /// Commit timeout in milliseconds
    #[arg(long, default_value_t = drover_registry::COMMIT_TIMEOUT_MS_DEFAULT)]
    commit_timeout_ms: u64,

    /// Whitelist file; when set, the active set tracks its contents
    #[arg(short, long)]
    whitelist: Option<PathBuf>,

    /// Whitelist poll interval in milliseconds
    #[arg(long, default_value_t = drover_server::config::WHITELIST_POLL_INTERVAL_MS_DEFAULT)]
    whitelist_poll_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind)
            .with_storage_path(self.storage)
            .with_commit_timeout(self.commit_timeout_ms)
            .with_whitelist_poll_interval(self.whitelist_poll_ms);
        if let Some(path) = self.whitelist {
            config = config.with_whitelist(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let config = cli.into_config();
    tracing::info!(bind = %config.bind, storage = %config.storage_path.display(), "drover server starting");

    // Open the transition log and replay it before accepting requests, so a
    // restarted registry resumes from its last committed state.
    let storage = FileStorage::open(&config.storage_path)
        .await
        .with_context(|| format!("opening transition log {}", config.storage_path.display()))?;
    let (active, inactive) = storage
        .recover()
        .await
        .context("replaying transition log")?;
    tracing::info!(
        active = active.len(),
        inactive = inactive.len(),
        "recovered membership from transition log"
    );

    let registry = Arc::new(NodeRegistry::with_commit_timeout(
        Arc::new(storage),
        Duration::from_millis(config.commit_timeout_ms),
    ));
    registry.update_active(active).await;
    registry.update_inactive(inactive).await;

    // Cross-component notification: downstream consumers (the scheduler,
    // today just the log) observe committed transitions here.
    tokio::spawn(log_membership_events(registry.subscribe()));

    if let Some(path) = config.whitelist.clone() {
        tokio::spawn(whitelist::watch(
            registry.clone(),
            path,
            Duration::from_millis(config.whitelist_poll_interval_ms),
        ));
    }

    let state = AppState::new(registry);
    tracing::info!(instance_id = %state.instance_id, "registry ready");

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}

async fn log_membership_events(
    mut events: tokio::sync::broadcast::Receiver<MembershipEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(?event, "membership transition"),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "membership event log lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}
