//! Group records: members, contributions, payouts, status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use susu_types::{Amount, Cycle, GroupConfig, GroupId, MemberAddress, Timestamp};

/// Lifecycle states of a group.
///
/// `Created → Active → Completed`, with `Active ⇄ Paused` and any
/// non-terminal state able to drop to `Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    /// Accepting members; no contributions yet.
    Created,
    /// Full and running cycles.
    Active,
    /// Frozen by the creator or admin; no money moves.
    Paused,
    /// Ran its course. Stakes become reclaimable.
    Completed,
    /// Aborted. Stakes and net contributions become reclaimable.
    Cancelled,
}

impl GroupStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One member's standing inside a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: MemberAddress,
    /// Collateral currently held for this member; mirrors the stake ledger.
    pub stake_amount: Amount,
    /// Everything the member has paid in, premiums included.
    pub total_contributed: Amount,
    /// The slice of contributions that landed in escrow as principal.
    /// Premiums go to the insurance pool and are excluded here.
    pub net_contributed: Amount,
    pub total_received: Amount,
    /// Trust score snapshot taken from the stake ledger at join time.
    pub trust_at_join: u16,
    pub joined_at: Timestamp,
    /// Cleared when the member exits the group; inactive members owe no
    /// further contributions.
    pub is_active: bool,
    /// Set once the member has taken their terminal withdrawal (maturity,
    /// early exit, or cancellation refund). Withdrawn members no longer owe
    /// contributions and never block cycle resolution.
    pub has_withdrawn: bool,
}

/// How one cycle contribution was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionStatus {
    /// Paid by the member inside the window.
    Paid,
    /// Missed; whatever could be slashed stands in for it.
    Defaulted,
    /// Missed, but the insurance pool covered (part of) the shortfall.
    CoveredByInsurance,
}

/// A settled contribution entry for one (cycle, member).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// What actually reached escrow for this entry.
    pub amount: Amount,
    pub timestamp: Timestamp,
    pub status: ContributionStatus,
}

/// A committed rotational payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: MemberAddress,
    /// Net of the platform fee.
    pub amount: Amount,
    /// Whether the transfer has landed. Committed payouts settle through
    /// [`settle_payout`](crate::GroupCoordinator::settle_payout).
    pub executed: bool,
}

/// Full state of one savings group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub config: GroupConfig,
    pub creator: MemberAddress,
    pub status: GroupStatus,
    /// Join order. Doubles as the default payout order.
    pub members: Vec<Member>,
    /// Fixed at activation; join order unless the creator overrode it.
    pub payout_order: Vec<MemberAddress>,
    /// The creator gets exactly one override, before activation.
    pub payout_order_overridden: bool,
    /// 1-based once active; 0 while still forming.
    pub current_cycle: Cycle,
    pub cycle_start: Timestamp,
    /// Index into `payout_order` of the next rotational recipient.
    pub next_payout_index: u32,
    /// Fixed-savings unlock time, set at activation.
    pub maturity: Option<Timestamp>,
    /// Escrow credited during the current cycle; becomes the rotational pot.
    pub cycle_pot: Amount,
    pub created_at: Timestamp,
    pub contributions: BTreeMap<(Cycle, MemberAddress), Contribution>,
    pub payouts: BTreeMap<Cycle, Payout>,
}

impl Group {
    pub fn new(
        id: GroupId,
        config: GroupConfig,
        creator: MemberAddress,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            config,
            creator,
            status: GroupStatus::Created,
            members: Vec::new(),
            payout_order: Vec::new(),
            payout_order_overridden: false,
            current_cycle: 0,
            cycle_start: Timestamp::EPOCH,
            next_payout_index: 0,
            maturity: None,
            cycle_pot: Amount::ZERO,
            created_at: now,
            contributions: BTreeMap::new(),
            payouts: BTreeMap::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.config.group_size
    }

    pub fn member(&self, address: &MemberAddress) -> Option<&Member> {
        self.members.iter().find(|m| &m.address == address)
    }

    pub fn member_mut(&mut self, address: &MemberAddress) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.address == address)
    }

    pub fn has_contributed(&self, cycle: Cycle, address: &MemberAddress) -> bool {
        self.contributions
            .contains_key(&(cycle, address.clone()))
    }

    /// Members still on the hook for the current cycle: active, not
    /// withdrawn, no contribution entry yet.
    pub fn outstanding(&self) -> usize {
        self.members
            .iter()
            .filter(|m| {
                m.is_active
                    && !m.has_withdrawn
                    && !self.has_contributed(self.current_cycle, &m.address)
            })
            .count()
    }
}
