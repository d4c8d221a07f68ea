//! Membership change notifications
//!
//! The registry publishes one event per committed transition on a broadcast
//! channel. Delivery is lossy for lagging receivers and never blocks the
//! registry; subscribers that need the full picture take a snapshot.

use crate::node::NodeAddress;

/// One committed membership transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// Address registered and made active
    Added(NodeAddress),
    /// Address removed entirely
    Removed(NodeAddress),
    /// Address moved into (or established in) the active set
    Activated(NodeAddress),
    /// Address moved into (or established in) the inactive set
    Deactivated(NodeAddress),
    /// Active set bulk-replaced; `size` is the new member count
    ActiveReplaced { size: usize },
    /// Inactive set bulk-replaced; `size` is the new member count
    InactiveReplaced { size: usize },
}
