//! Node registry actor
//!
//! Sole owner of the active/inactive membership sets and gateway for every
//! state change. Correctness rests on two rules:
//!
//! - Durability precedes visibility: a transition is applied in memory only
//!   after the storage port acknowledges the write as committed. A declined,
//!   failed, or timed-out write leaves the sets untouched and the operation
//!   reports `false`.
//! - Single-writer serialization: one mutex guards both sets and is held for
//!   the whole operation, including the storage await. Operations execute in
//!   acceptance order; readers never observe a half-applied transition.

use crate::event::MembershipEvent;
use crate::membership::Membership;
use crate::node::NodeAddress;
use crate::storage::RegistryStorage;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Default bound on a single storage commit await, in milliseconds
pub const COMMIT_TIMEOUT_MS_DEFAULT: u64 = 5_000;

/// Capacity of the membership event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The two membership sets, guarded together
#[derive(Debug, Default)]
struct MembershipSets {
    active: Membership,
    inactive: Membership,
}

impl MembershipSets {
    /// Partition invariant: an address is in at most one set
    fn partitioned(&self, addr: &NodeAddress) -> bool {
        !(self.active.contains(addr) && self.inactive.contains(addr))
    }
}

/// Node registry: active/inactive membership with a durable-commit protocol
///
/// Constructed once at startup and shared by handle; there is no process-wide
/// singleton. Mutating operations return `true` on success or idempotent
/// no-op and `false` when the storage commit did not happen. The registry
/// never retries; retry policy belongs to the caller.
pub struct NodeRegistry {
    storage: Arc<dyn RegistryStorage>,
    sets: Mutex<MembershipSets>,
    events: broadcast::Sender<MembershipEvent>,
    commit_timeout: Duration,
}

impl NodeRegistry {
    /// Create a registry with the default commit timeout
    pub fn new(storage: Arc<dyn RegistryStorage>) -> Self {
        Self::with_commit_timeout(storage, Duration::from_millis(COMMIT_TIMEOUT_MS_DEFAULT))
    }

    /// Create a registry with an explicit commit timeout
    pub fn with_commit_timeout(storage: Arc<dyn RegistryStorage>, commit_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            sets: Mutex::new(MembershipSets::default()),
            events,
            commit_timeout,
        }
    }

    /// Subscribe to committed membership transitions
    pub fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.events.subscribe()
    }

    /// Register a node; it starts out active
    ///
    /// Reinserting an already-known node (active or inactive) is a successful
    /// no-op with no new storage write.
    pub async fn add(&self, addr: &NodeAddress) -> bool {
        let mut sets = self.sets.lock().await;

        if sets.active.contains(addr) || sets.inactive.contains(addr) {
            debug!(%addr, "add: already known, no-op");
            return true;
        }

        if !self.commit("add", addr, self.storage.add(addr)).await {
            return false;
        }

        sets.active.insert(addr);
        debug_assert!(sets.partitioned(addr));
        info!(%addr, "node added");
        let _ = self.events.send(MembershipEvent::Added(addr.clone()));
        true
    }

    /// Remove a node from whichever set holds it
    ///
    /// Removing an unknown node is a successful no-op with no storage write.
    pub async fn remove(&self, addr: &NodeAddress) -> bool {
        let mut sets = self.sets.lock().await;

        if !sets.active.contains(addr) && !sets.inactive.contains(addr) {
            debug!(%addr, "remove: unknown, no-op");
            return true;
        }

        if !self.commit("remove", addr, self.storage.remove(addr)).await {
            return false;
        }

        sets.active.remove(addr);
        sets.inactive.remove(addr);
        info!(%addr, "node removed");
        let _ = self.events.send(MembershipEvent::Removed(addr.clone()));
        true
    }

    /// Make a node eligible for work
    ///
    /// Moves an inactive node to active. Already-active is a no-op. An
    /// entirely unknown node is established directly in the active set:
    /// activation both registers and enables.
    pub async fn activate(&self, addr: &NodeAddress) -> bool {
        let mut sets = self.sets.lock().await;

        if sets.active.contains(addr) {
            debug!(%addr, "activate: already active, no-op");
            return true;
        }

        if !self.commit("activate", addr, self.storage.activate(addr)).await {
            return false;
        }

        sets.inactive.remove(addr);
        sets.active.insert(addr);
        debug_assert!(sets.partitioned(addr));
        info!(%addr, "node activated");
        let _ = self.events.send(MembershipEvent::Activated(addr.clone()));
        true
    }

    /// Exclude a node from work assignment
    ///
    /// Symmetric to `activate`: moves an active node to inactive,
    /// already-inactive is a no-op, an unknown node is established directly
    /// in the inactive set.
    pub async fn deactivate(&self, addr: &NodeAddress) -> bool {
        let mut sets = self.sets.lock().await;

        if sets.inactive.contains(addr) {
            debug!(%addr, "deactivate: already inactive, no-op");
            return true;
        }

        if !self
            .commit("deactivate", addr, self.storage.deactivate(addr))
            .await
        {
            return false;
        }

        sets.active.remove(addr);
        sets.inactive.insert(addr);
        debug_assert!(sets.partitioned(addr));
        info!(%addr, "node deactivated");
        let _ = self.events.send(MembershipEvent::Deactivated(addr.clone()));
        true
    }

    /// Replace the entire active set
    ///
    /// Used for full-state resynchronization (whitelist reload, recovery);
    /// the desired set is assumed already durable at its source, so no
    /// per-entry storage writes happen. The caller is responsible for not
    /// supplying addresses that overlap the inactive set.
    pub async fn update_active(&self, desired: Membership) {
        let mut sets = self.sets.lock().await;
        let size = desired.len();
        sets.active = desired;
        info!(size, "active set replaced");
        let _ = self.events.send(MembershipEvent::ActiveReplaced { size });
    }

    /// Replace the entire inactive set; see `update_active`
    pub async fn update_inactive(&self, desired: Membership) {
        let mut sets = self.sets.lock().await;
        let size = desired.len();
        sets.inactive = desired;
        info!(size, "inactive set replaced");
        let _ = self.events.send(MembershipEvent::InactiveReplaced { size });
    }

    /// Snapshot of the active set
    pub async fn activated(&self) -> Membership {
        self.sets.lock().await.active.clone()
    }

    /// Snapshot of the inactive set
    pub async fn deactivated(&self) -> Membership {
        self.sets.lock().await.inactive.clone()
    }

    /// Await a storage write under the commit timeout
    ///
    /// Timeout, transport error, and an explicit decline all count as commit
    /// failure. The in-flight write is simply dropped on timeout; whether it
    /// landed is resolved by log replay at the next startup.
    async fn commit<F>(&self, op: &'static str, addr: &NodeAddress, write: F) -> bool
    where
        F: Future<Output = crate::error::StorageResult<bool>>,
    {
        match tokio::time::timeout(self.commit_timeout, write).await {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                warn!(%addr, op, "storage declined commit");
                false
            }
            Ok(Err(error)) => {
                warn!(%addr, op, %error, "storage commit failed");
                false
            }
            Err(_) => {
                warn!(
                    %addr,
                    op,
                    timeout_ms = self.commit_timeout.as_millis() as u64,
                    "storage commit timed out"
                );
                false
            }
        }
    }
}
