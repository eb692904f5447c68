//! Fundamental types for the susu protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: addresses, amounts, timestamps, group configuration, protocol
//! parameters, capability handles and the external collaborator traits.

pub mod address;
pub mod amount;
pub mod capability;
pub mod config;
pub mod error;
pub mod external;
pub mod params;
pub mod time;

pub use address::MemberAddress;
pub use amount::{Amount, Bps, BPS_DENOMINATOR};
pub use capability::Capability;
pub use config::{ConfigError, GroupConfig, GroupModel};
pub use error::ErrorKind;
pub use external::{AdapterError, TransferError, ValueTransfer, YieldAdapter};
pub use params::ProtocolParams;
pub use time::Timestamp;

/// Unique identifier for a savings group, assigned by the registry.
pub type GroupId = u64;

/// Unique identifier for an insurance claim.
pub type ClaimId = u64;

/// Cycle ordinal within a group, starting at 1 when the group activates.
pub type Cycle = u32;
