//! Membership sets
//!
//! A membership set maps hostname to the ports registered for that hostname.
//! BTree containers keep iteration order deterministic, so list responses
//! and recovered state are stable across runs.

use crate::node::NodeAddress;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Set of node addresses, keyed by hostname
///
/// A hostname may expose multiple ports; each `(hostname, port)` pair is one
/// member. Port sets are deduplicated, and a hostname with no remaining ports
/// is pruned from the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Membership {
    hosts: BTreeMap<String, BTreeSet<u16>>,
}

impl Membership {
    /// Create an empty membership set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the address is a member
    pub fn contains(&self, addr: &NodeAddress) -> bool {
        self.hosts
            .get(addr.hostname())
            .is_some_and(|ports| ports.contains(&addr.port()))
    }

    /// Insert an address; returns false if it was already present
    pub fn insert(&mut self, addr: &NodeAddress) -> bool {
        self.hosts
            .entry(addr.hostname().to_string())
            .or_default()
            .insert(addr.port())
    }

    /// Remove an address; returns false if it was not present
    pub fn remove(&mut self, addr: &NodeAddress) -> bool {
        let Some(ports) = self.hosts.get_mut(addr.hostname()) else {
            return false;
        };

        let removed = ports.remove(&addr.port());
        if ports.is_empty() {
            self.hosts.remove(addr.hostname());
        }
        removed
    }

    /// Total number of member addresses across all hostnames
    pub fn len(&self) -> usize {
        self.hosts.values().map(BTreeSet::len).sum()
    }

    /// Whether the set has no members
    ///
    /// Counts addresses, not hostnames: a deserialized map may carry a
    /// hostname with an empty port set, which is still no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ports registered for a hostname
    pub fn ports(&self, hostname: &str) -> Option<&BTreeSet<u16>> {
        self.hosts.get(hostname)
    }

    /// Iterate all member addresses in deterministic order
    pub fn addresses(&self) -> impl Iterator<Item = NodeAddress> + '_ {
        self.hosts.iter().flat_map(|(hostname, ports)| {
            ports
                .iter()
                .map(|port| NodeAddress::new_unchecked(hostname.clone(), *port))
        })
    }
}

impl FromIterator<NodeAddress> for Membership {
    fn from_iter<I: IntoIterator<Item = NodeAddress>>(iter: I) -> Self {
        let mut set = Self::new();
        for addr in iter {
            set.insert(&addr);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hostname: &str, port: u16) -> NodeAddress {
        NodeAddress::new(hostname, port).unwrap()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = Membership::new();
        assert!(!set.contains(&addr("h1", 5000)));

        assert!(set.insert(&addr("h1", 5000)));
        assert!(set.contains(&addr("h1", 5000)));
        assert_eq!(set.len(), 1);

        // Reinserting is a no-op
        assert!(!set.insert(&addr("h1", 5000)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_multiple_ports_per_host() {
        let mut set = Membership::new();
        set.insert(&addr("h1", 5000));
        set.insert(&addr("h1", 5001));
        set.insert(&addr("h2", 5000));

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.ports("h1").unwrap().iter().copied().collect::<Vec<_>>(),
            vec![5000, 5001]
        );
    }

    #[test]
    fn test_remove_prunes_empty_host() {
        let mut set = Membership::new();
        set.insert(&addr("h1", 5000));

        assert!(set.remove(&addr("h1", 5000)));
        assert!(set.is_empty());
        assert!(set.ports("h1").is_none());

        // Removing again is a no-op
        assert!(!set.remove(&addr("h1", 5000)));
    }

    #[test]
    fn test_addresses_deterministic_order() {
        let mut set = Membership::new();
        set.insert(&addr("h2", 5000));
        set.insert(&addr("h1", 5001));
        set.insert(&addr("h1", 5000));

        let listed: Vec<String> = set.addresses().map(|a| a.to_string()).collect();
        assert_eq!(listed, vec!["h1:5000", "h1:5001", "h2:5000"]);
    }

    #[test]
    fn test_deserialized_empty_port_set_is_empty() {
        // insert/remove never leave a hostname without ports, but a
        // deserialized map can arrive that way
        let set: Membership = serde_json::from_value(serde_json::json!({ "h1": [] })).unwrap();
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
        assert!(!set.contains(&addr("h1", 5000)));
    }

    #[test]
    fn test_serialize_shape() {
        let mut set = Membership::new();
        set.insert(&addr("h1", 5000));
        set.insert(&addr("h1", 5001));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "h1": [5000, 5001] }));
    }
}
