//! Insurance-ledger errors.

use crate::claim::ClaimStatus;
use susu_types::{ClaimId, ErrorKind, GroupId, TransferError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsuranceError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("capability does not grant access to group {0}")]
    AccessDenied(GroupId),

    #[error("group {0} already holds an insurance-ledger grant")]
    AlreadyGranted(GroupId),

    #[error("no insurance pool for group {0}")]
    PoolNotFound(GroupId),

    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("caller is not an authorized claim processor")]
    NotProcessor,

    #[error("caller is not the insurance-ledger admin")]
    NotAdmin,

    #[error("claim of {requested} exceeds the cap of {cap}")]
    ClaimTooLarge { requested: u128, cap: u128 },

    #[error("claim cooldown active for another {remaining_secs}s")]
    CooldownActive { remaining_secs: u64 },

    #[error("claim {claim} is {status:?}, operation not permitted")]
    InvalidStatus { claim: ClaimId, status: ClaimStatus },

    #[error("processor has already approved claim {0}")]
    DuplicateApproval(ClaimId),

    #[error("claim amount may only be revised downward")]
    AmountIncreased,

    #[error("insufficient pool balance: need {needed}, have {available}")]
    InsufficientPool { needed: u128, available: u128 },

    #[error("insufficient reserve: need {needed}, have {available}")]
    InsufficientReserve { needed: u128, available: u128 },

    #[error("arithmetic overflow in insurance accounting")]
    Overflow,

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("storage error: {0}")]
    Store(String),
}

impl InsuranceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount | Self::AmountIncreased | Self::Overflow | Self::Store(_) => {
                ErrorKind::InvalidInput
            }
            Self::AccessDenied(_) | Self::NotProcessor | Self::NotAdmin => ErrorKind::Unauthorized,
            Self::AlreadyGranted(_)
            | Self::ClaimTooLarge { .. }
            | Self::CooldownActive { .. }
            | Self::InvalidStatus { .. }
            | Self::DuplicateApproval(_)
            | Self::Transfer(_) => ErrorKind::PreconditionFailed,
            Self::InsufficientPool { .. } | Self::InsufficientReserve { .. } => {
                ErrorKind::InsufficientBalance
            }
            Self::PoolNotFound(_) | Self::ClaimNotFound(_) => ErrorKind::NotFound,
        }
    }
}
