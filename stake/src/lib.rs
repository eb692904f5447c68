//! Stake ledger for the susu protocol.
//!
//! Tracks each member's collateral per group, their platform-wide trust
//! score and default history, and the blacklist that keeps repeat
//! defaulters out of new groups.

pub mod error;
pub mod ledger;

pub use error::StakeError;
pub use ledger::{SlashOutcome, StakeLedger, StakeRecord, TrustRecord};
