//! Lifecycle coordinator errors.

use susu_escrow::EscrowError;
use susu_insurance::InsuranceError;
use susu_stake::StakeError;
use susu_types::{ConfigError, Cycle, ErrorKind, GroupId, MemberAddress, Timestamp, TransferError};
use thiserror::Error;

use crate::group::GroupStatus;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("operation already in flight for group {0}")]
    Reentrancy(GroupId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("{member} is not a member of group {group}")]
    NotAMember { group: GroupId, member: MemberAddress },

    #[error("{member} already joined group {group}")]
    AlreadyMember { group: GroupId, member: MemberAddress },

    #[error("group {0} is full")]
    GroupFull(GroupId),

    #[error("group {group} is {status}, which this operation does not allow")]
    InvalidStatus { group: GroupId, status: GroupStatus },

    #[error("contribution window for cycle {cycle} of group {group} has closed")]
    WindowClosed { group: GroupId, cycle: Cycle },

    #[error("contribution window for cycle {cycle} of group {group} is still open")]
    WindowStillOpen { group: GroupId, cycle: Cycle },

    #[error("{member} already contributed for cycle {cycle}")]
    AlreadyContributed { cycle: Cycle, member: MemberAddress },

    #[error("{member} already settled cycle {cycle} (paid, covered, or defaulted)")]
    AlreadySettled { cycle: Cycle, member: MemberAddress },

    #[error("{0} has already withdrawn from this group")]
    AlreadyWithdrawn(MemberAddress),

    #[error("group has not matured yet (maturity at {0})")]
    NotMatured(Timestamp),

    #[error("group already matured; early withdrawal no longer applies")]
    AlreadyMatured,

    #[error("only the group creator may do this")]
    NotCreator,

    #[error("only the group creator or the platform admin may do this")]
    NotCreatorOrAdmin,

    #[error("payout order was already overridden for group {0}")]
    PayoutOrderAlreadySet(GroupId),

    #[error("payout order must be a permutation of the current members")]
    InvalidPayoutOrder,

    #[error("no committed payout for cycle {cycle} of group {group}")]
    PayoutNotFound { group: GroupId, cycle: Cycle },

    #[error("payout for cycle {cycle} of group {group} was already settled")]
    PayoutAlreadySettled { group: GroupId, cycle: Cycle },

    #[error("{0} has nothing to reclaim here")]
    NothingToReclaim(MemberAddress),

    #[error("group {group} does not run the model this operation applies to")]
    UnsupportedModel { group: GroupId },

    #[error("arithmetic overflow in group accounting")]
    Overflow,

    #[error("storage error: {0}")]
    Store(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stake(#[from] StakeError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error(transparent)]
    Insurance(#[from] InsuranceError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Reentrancy(_)
            | Self::InvalidStatus { .. }
            | Self::WindowClosed { .. }
            | Self::WindowStillOpen { .. }
            | Self::AlreadyContributed { .. }
            | Self::AlreadySettled { .. }
            | Self::AlreadyWithdrawn(_)
            | Self::AlreadyMember { .. }
            | Self::GroupFull(_)
            | Self::NotMatured(_)
            | Self::AlreadyMatured
            | Self::PayoutOrderAlreadySet(_)
            | Self::PayoutAlreadySettled { .. }
            | Self::NothingToReclaim(_)
            | Self::UnsupportedModel { .. }
            | Self::Transfer(_) => ErrorKind::PreconditionFailed,
            Self::Overflow | Self::Store(_) => ErrorKind::InvalidInput,
            Self::GroupNotFound(_) | Self::PayoutNotFound { .. } => ErrorKind::NotFound,
            Self::NotAMember { .. } | Self::NotCreator | Self::NotCreatorOrAdmin => {
                ErrorKind::Unauthorized
            }
            Self::Config(_) | Self::InvalidPayoutOrder => ErrorKind::InvalidInput,
            Self::Stake(e) => e.kind(),
            Self::Escrow(e) => e.kind(),
            Self::Insurance(e) => e.kind(),
        }
    }
}
