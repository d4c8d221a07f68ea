//! Drover Server
//!
//! Control-plane HTTP surface over the node registry, plus the process
//! wiring that does not belong in the core: configuration, whitelist
//! reload, startup recovery.

pub mod api;
pub mod config;
pub mod state;
pub mod whitelist;

pub use config::ServerConfig;
pub use state::AppState;
