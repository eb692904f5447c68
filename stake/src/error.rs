//! Stake-ledger errors.

use susu_types::{ErrorKind, GroupId, MemberAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakeError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("capability does not grant access to group {0}")]
    AccessDenied(GroupId),

    #[error("group {0} already holds a stake-ledger grant")]
    AlreadyGranted(GroupId),

    #[error("insufficient stake: need {needed}, have {available}")]
    InsufficientStake { needed: u128, available: u128 },

    #[error("no stake record for {member} in group {group}")]
    RecordNotFound { group: GroupId, member: MemberAddress },

    #[error("{0} is blacklisted")]
    Blacklisted(MemberAddress),

    #[error("caller is not the stake-ledger admin")]
    NotAdmin,

    #[error("arithmetic overflow in stake accounting")]
    Overflow,

    #[error("storage error: {0}")]
    Store(String),
}

impl StakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount | Self::Overflow | Self::Store(_) => ErrorKind::InvalidInput,
            Self::AccessDenied(_) | Self::NotAdmin => ErrorKind::Unauthorized,
            Self::AlreadyGranted(_) | Self::Blacklisted(_) => ErrorKind::PreconditionFailed,
            Self::InsufficientStake { .. } => ErrorKind::InsufficientBalance,
            Self::RecordNotFound { .. } => ErrorKind::NotFound,
        }
    }
}
