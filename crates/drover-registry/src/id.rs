//! Registry identifiers
//!
//! Opaque random 128-bit identifier used to tag registry instances and
//! anything else the control plane needs a unique handle for. Stateless
//! value type; the registry logic itself never inspects it.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Random 128-bit identifier with byte and string encodings
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryId(Uuid);

impl RegistryId {
    /// Generate a fresh random identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reconstruct an identifier from its 16-byte encoding
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The 16-byte encoding
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegistryId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(|e| RegistryError::InvalidId {
            id: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(uuid))
    }
}
