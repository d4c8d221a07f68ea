//! Shared application state
//!
//! One registry handle constructed at startup and cloned into every
//! handler; no hidden singletons.

use drover_registry::{NodeRegistry, RegistryId};
use std::sync::Arc;
use std::time::Instant;

/// State shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The node registry
    pub registry: Arc<NodeRegistry>,
    /// Identifier of this registry instance
    pub instance_id: RegistryId,
    /// Process start time, for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Create state around an already-constructed registry
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            instance_id: RegistryId::random(),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server started
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
