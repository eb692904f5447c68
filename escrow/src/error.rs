//! Escrow-ledger errors.

use susu_types::{AdapterError, ErrorKind, GroupId, TransferError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("net payout {net} exceeds gross {gross}")]
    NetExceedsGross { net: u128, gross: u128 },

    #[error("capability does not grant access to group {0}")]
    AccessDenied(GroupId),

    #[error("group {0} already holds an escrow-ledger grant")]
    AlreadyGranted(GroupId),

    #[error("no escrow balance for group {0}")]
    BalanceNotFound(GroupId),

    #[error("insufficient principal: need {needed}, have {available}")]
    InsufficientPrincipal { needed: u128, available: u128 },

    #[error("insufficient pending payouts: need {needed}, have {available}")]
    InsufficientPending { needed: u128, available: u128 },

    #[error("insufficient yield reserve: need {needed}, have {available}")]
    InsufficientYield { needed: u128, available: u128 },

    #[error("insufficient platform fees: need {needed}, have {available}")]
    InsufficientFees { needed: u128, available: u128 },

    #[error("cannot raise {needed} of liquidity: on hand {on_hand}, deployed {deployed}")]
    InsufficientLiquidity {
        needed: u128,
        on_hand: u128,
        deployed: u128,
    },

    #[error("caller is not the escrow-ledger admin")]
    NotAdmin,

    #[error("arithmetic overflow in escrow accounting")]
    Overflow,

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("storage error: {0}")]
    Store(String),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount | Self::NetExceedsGross { .. } | Self::Overflow | Self::Store(_) => {
                ErrorKind::InvalidInput
            }
            Self::AccessDenied(_) | Self::NotAdmin => ErrorKind::Unauthorized,
            Self::AlreadyGranted(_) | Self::Transfer(_) | Self::Adapter(_) => {
                ErrorKind::PreconditionFailed
            }
            Self::InsufficientPrincipal { .. }
            | Self::InsufficientPending { .. }
            | Self::InsufficientYield { .. }
            | Self::InsufficientFees { .. }
            | Self::InsufficientLiquidity { .. } => ErrorKind::InsufficientBalance,
            Self::BalanceNotFound(_) => ErrorKind::NotFound,
        }
    }
}
