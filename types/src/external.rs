//! External collaborator interfaces.
//!
//! The core consumes these traits and never implements them: the settlement
//! asset lives behind [`ValueTransfer`], the yield source behind
//! [`YieldAdapter`]. Both are expected to be atomic per call; the core
//! propagates their failures and never retries.

use crate::amount::Amount;
use crate::MemberAddress;
use thiserror::Error;

/// Failure from the settlement-asset transfer layer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer of {amount} to {to} failed: {reason}")]
    Failed {
        to: MemberAddress,
        amount: Amount,
        reason: String,
    },

    #[error("insufficient allowance or balance for {from}")]
    InsufficientFunds { from: MemberAddress },
}

/// Moves settlement-asset balances between accounts.
pub trait ValueTransfer {
    /// Pay out from the protocol's own account.
    fn transfer(&self, to: &MemberAddress, amount: Amount) -> Result<(), TransferError>;

    /// Pull funds from a member account into the protocol's account.
    fn transfer_from(
        &self,
        from: &MemberAddress,
        to: &MemberAddress,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

/// Failure from the yield strategy.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("yield deposit of {0} failed: {1}")]
    DepositFailed(Amount, String),

    #[error("yield withdrawal of {0} failed: {1}")]
    WithdrawFailed(Amount, String),

    #[error("harvest failed: {0}")]
    HarvestFailed(String),
}

/// A yield strategy holding deployed idle funds.
pub trait YieldAdapter {
    /// Deploy funds into the strategy.
    fn deposit(&self, amount: Amount) -> Result<(), AdapterError>;

    /// Pull funds back out of the strategy.
    fn withdraw(&self, amount: Amount) -> Result<(), AdapterError>;

    /// Realise accrued yield; returns the harvested amount. Harvesting twice
    /// at the same instant yields zero the second time.
    fn harvest(&self) -> Result<Amount, AdapterError>;

    /// Funds currently deployed in the strategy.
    fn balance(&self) -> Amount;

    /// Advertised annual yield, in basis points.
    fn apy_bps(&self) -> u32;
}
