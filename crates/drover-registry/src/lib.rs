//! Drover Registry
//!
//! Node-registry core for the Drover control plane.
//!
//! # Overview
//!
//! The registry provides:
//! - Active/inactive membership tracking for worker endpoints
//! - A durable-commit protocol: no transition is visible before the
//!   storage backend acknowledges it
//! - A pluggable storage port (file-backed in production, mock in tests)
//! - Membership change notifications for in-process subscribers

pub mod error;
pub mod event;
pub mod id;
pub mod membership;
pub mod node;
pub mod registry;
pub mod storage;

pub use error::{RegistryError, RegistryResult, StorageError, StorageResult};
pub use event::MembershipEvent;
pub use id::RegistryId;
pub use membership::Membership;
pub use node::NodeAddress;
pub use registry::{NodeRegistry, COMMIT_TIMEOUT_MS_DEFAULT};
pub use storage::{FileStorage, MockStorage, RegistryStorage};
