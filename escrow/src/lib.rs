//! Escrow ledger for the susu protocol.
//!
//! Holds every group's principal, yield reserve and pending payouts, plus
//! the global cash position: how much settlement asset sits on hand versus
//! deployed in the yield adapter. Deposits sweep idle funds above the
//! liquidity buffer into the adapter; withdrawals pull shortfalls back.

pub mod error;
pub mod ledger;

pub use error::EscrowError;
pub use ledger::{EscrowBalance, EscrowLedger, HarvestSplit};
