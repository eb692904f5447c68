//! Claim records and their lifecycle.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use susu_types::{Amount, ClaimId, GroupId, MemberAddress, Timestamp};

/// Claim lifecycle. Transitions are monotonic: `Submitted → Approved → Paid`
/// or `Submitted → Rejected`; there is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Paid)
    }
}

/// A single insurance claim. Retained permanently, whatever its outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsuranceClaim {
    pub id: ClaimId,
    pub group: GroupId,
    pub claimant: MemberAddress,
    /// Payout amount. Approvers may revise it downward while the claim is
    /// under review; it can never grow.
    pub amount: Amount,
    /// Opaque reference to off-ledger evidence (document hash, URI).
    pub evidence: String,
    pub status: ClaimStatus,
    pub submitted_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    /// Distinct processors who voted to approve.
    pub approvals: BTreeSet<MemberAddress>,
}

impl InsuranceClaim {
    pub fn new(
        id: ClaimId,
        group: GroupId,
        claimant: MemberAddress,
        amount: Amount,
        evidence: String,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            id,
            group,
            claimant,
            amount,
            evidence,
            status: ClaimStatus::Submitted,
            submitted_at,
            processed_at: None,
            approvals: BTreeSet::new(),
        }
    }
}
