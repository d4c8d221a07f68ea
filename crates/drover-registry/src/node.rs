//! Node addressing
//!
//! A worker endpoint is identified by hostname and port. Validation lives
//! here so the registry core never sees a malformed address.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a hostname in bytes
pub const HOSTNAME_LENGTH_BYTES_MAX: usize = 255;

/// Endpoint of one worker node
///
/// Two addresses are equal iff both hostname and port are equal. A single
/// hostname may register several ports, each a distinct address.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeAddress {
    hostname: String,
    port: u16,
}

impl NodeAddress {
    /// Create a new address with validation
    ///
    /// # Errors
    /// Returns error if the hostname is empty, too long, or contains
    /// characters outside `[A-Za-z0-9.-]`.
    pub fn new(hostname: impl Into<String>, port: u16) -> RegistryResult<Self> {
        let hostname = hostname.into();

        if hostname.is_empty() {
            return Err(RegistryError::InvalidAddress {
                address: format!("{}:{}", hostname, port),
                reason: "hostname cannot be empty".into(),
            });
        }

        if hostname.len() > HOSTNAME_LENGTH_BYTES_MAX {
            return Err(RegistryError::InvalidAddress {
                address: format!("{}:{}", hostname, port),
                reason: format!(
                    "hostname length {} exceeds limit {}",
                    hostname.len(),
                    HOSTNAME_LENGTH_BYTES_MAX
                ),
            });
        }

        let valid = hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

        if !valid {
            return Err(RegistryError::InvalidAddress {
                address: format!("{}:{}", hostname, port),
                reason: "hostname contains invalid characters".into(),
            });
        }

        Ok(Self { hostname, port })
    }

    /// Create an address without validation (for internal use)
    ///
    /// Caller must ensure the hostname is valid.
    #[doc(hidden)]
    pub fn new_unchecked(hostname: String, port: u16) -> Self {
        debug_assert!(!hostname.is_empty());
        debug_assert!(hostname.len() <= HOSTNAME_LENGTH_BYTES_MAX);
        Self { hostname, port }
    }

    /// The hostname component
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The port component
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = RegistryError;

    /// Parse `hostname:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hostname, port) = s.rsplit_once(':').ok_or_else(|| {
            RegistryError::InvalidAddress {
                address: s.to_string(),
                reason: "expected hostname:port".into(),
            }
        })?;

        let port: u16 = port.parse().map_err(|_| RegistryError::InvalidAddress {
            address: s.to_string(),
            reason: format!("invalid port: {}", port),
        })?;

        Self::new(hostname, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_valid() {
        let addr = NodeAddress::new("worker-1.example.com", 5051).unwrap();
        assert_eq!(addr.hostname(), "worker-1.example.com");
        assert_eq!(addr.port(), 5051);
        assert_eq!(format!("{}", addr), "worker-1.example.com:5051");
    }

    #[test]
    fn test_address_equality_on_both_fields() {
        let a = NodeAddress::new("h1", 5000).unwrap();
        let b = NodeAddress::new("h1", 5000).unwrap();
        let c = NodeAddress::new("h1", 5001).unwrap();
        let d = NodeAddress::new("h2", 5000).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_address_invalid_empty_hostname() {
        let result = NodeAddress::new("", 5000);
        assert!(matches!(result, Err(RegistryError::InvalidAddress { .. })));
    }

    #[test]
    fn test_address_invalid_chars() {
        let result = NodeAddress::new("host/1", 5000);
        assert!(matches!(result, Err(RegistryError::InvalidAddress { .. })));
    }

    #[test]
    fn test_address_hostname_too_long() {
        let long = "a".repeat(HOSTNAME_LENGTH_BYTES_MAX + 1);
        let result = NodeAddress::new(long, 5000);
        assert!(matches!(result, Err(RegistryError::InvalidAddress { .. })));
    }

    #[test]
    fn test_address_parse() {
        let addr: NodeAddress = "h1:5000".parse().unwrap();
        assert_eq!(addr, NodeAddress::new("h1", 5000).unwrap());
    }

    #[test]
    fn test_address_parse_invalid() {
        assert!("h1".parse::<NodeAddress>().is_err());
        assert!("h1:notaport".parse::<NodeAddress>().is_err());
        assert!("h1:70000".parse::<NodeAddress>().is_err());
    }
}
