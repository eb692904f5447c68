//! Insurance ledger for the susu protocol.
//!
//! Collects premium slices from contributions into per-group pools with a
//! non-claimable reserve cushion, and runs the claim workflow: submission,
//! multi-approver voting, rejection, payout. Also covers missed-payment
//! shortfalls for insured groups.

pub mod claim;
pub mod error;
pub mod ledger;

pub use claim::{ClaimStatus, InsuranceClaim};
pub use error::InsuranceError;
pub use ledger::{InsuranceLedger, PremiumPool};
