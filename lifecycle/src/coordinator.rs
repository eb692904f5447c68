//! The group coordinator: wires the stake, escrow and insurance ledgers
//! together and drives every group through its lifecycle.
//!
//! The coordinator is a cheap-to-clone handle over shared state. Every
//! mutating operation takes the per-group reentrancy guard before touching
//! anything, validates all preconditions, performs any external transfer,
//! and only then commits ledger mutations, so an operation either happens in
//! full or leaves no trace.
//!
//! Money leaves the system through pull-style settlement: cycle resolution
//! commits a payout as pending, and `settle_payout` (or the reclaim
//! operations after completion or cancellation) moves the cash. One
//! transfer per operation, so nothing can half-land.

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use susu_escrow::{EscrowLedger, HarvestSplit};
use susu_insurance::{ClaimStatus, InsuranceLedger};
use susu_stake::{StakeError, StakeLedger};
use susu_store::{EscrowStore, GroupStore, InsuranceStore, StakeStore};
use susu_types::{
    Amount, Capability, ClaimId, Cycle, GroupConfig, GroupId, GroupModel, MemberAddress,
    ProtocolParams, Timestamp, ValueTransfer, YieldAdapter,
};
use tracing::{debug, info, warn};

use crate::error::LifecycleError;
use crate::group::{Contribution, ContributionStatus, Group, GroupStatus, Member, Payout};
use crate::guard::ReentrancyGuard;

/// Guard slot for operations that precede or span groups (creation, fee
/// withdrawal). Group ids start at 1, so the slot never collides.
const REGISTRY_SLOT: GroupId = 0;

/// Capabilities a group was issued at creation, one per ledger.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct GroupCaps {
    stake: Capability,
    escrow: Capability,
    insurance: Capability,
}

#[derive(Clone, Serialize, Deserialize)]
struct GroupEntry {
    group: Group,
    caps: GroupCaps,
}

struct CoordinatorState {
    admin: MemberAddress,
    /// The protocol's own settlement account; inbound pulls land here.
    vault_account: MemberAddress,
    next_group_id: GroupId,
    groups: HashMap<GroupId, GroupEntry>,
    stake: StakeLedger,
    escrow: EscrowLedger,
    insurance: InsuranceLedger,
}

impl CoordinatorState {
    fn entry(&self, id: GroupId) -> Result<&GroupEntry, LifecycleError> {
        self.groups.get(&id).ok_or(LifecycleError::GroupNotFound(id))
    }

    fn entry_mut(&mut self, id: GroupId) -> Result<&mut GroupEntry, LifecycleError> {
        self.groups
            .get_mut(&id)
            .ok_or(LifecycleError::GroupNotFound(id))
    }
}

/// Handle to the running protocol. Clones share state and guard.
#[derive(Clone)]
pub struct GroupCoordinator {
    inner: Rc<RefCell<CoordinatorState>>,
    guard: ReentrancyGuard,
    vault: Rc<dyn ValueTransfer>,
    adapter: Rc<dyn YieldAdapter>,
}

impl GroupCoordinator {
    pub fn new(
        params: ProtocolParams,
        admin: MemberAddress,
        vault_account: MemberAddress,
        processors: impl IntoIterator<Item = MemberAddress>,
        vault: Rc<dyn ValueTransfer>,
        adapter: Rc<dyn YieldAdapter>,
    ) -> Self {
        let state = CoordinatorState {
            admin: admin.clone(),
            vault_account,
            next_group_id: 1,
            groups: HashMap::new(),
            stake: StakeLedger::new(params.clone(), admin.clone()),
            escrow: EscrowLedger::new(params.clone(), admin.clone()),
            insurance: InsuranceLedger::new(params, admin, processors),
        };
        Self {
            inner: Rc::new(RefCell::new(state)),
            guard: ReentrancyGuard::new(),
            vault,
            adapter,
        }
    }

    fn enter(&self, group: GroupId) -> Result<crate::guard::GuardToken, LifecycleError> {
        self.guard
            .enter(group)
            .ok_or(LifecycleError::Reentrancy(group))
    }

    fn state_mut(&self, group: GroupId) -> Result<RefMut<'_, CoordinatorState>, LifecycleError> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| LifecycleError::Reentrancy(group))
    }

    // --- registry ---------------------------------------------------------

    /// Validate a configuration, allocate a group id and issue the group's
    /// ledger capabilities.
    pub fn create_group(
        &self,
        creator: &MemberAddress,
        config: GroupConfig,
        now: Timestamp,
    ) -> Result<GroupId, LifecycleError> {
        config.validate()?;
        let _token = self.enter(REGISTRY_SLOT)?;
        let mut state = self.state_mut(REGISTRY_SLOT)?;

        let id = state.next_group_id;
        state.next_group_id = state
            .next_group_id
            .checked_add(1)
            .ok_or(LifecycleError::Overflow)?;
        let caps = GroupCaps {
            stake: state.stake.grant_access(id)?,
            escrow: state.escrow.grant_access(id)?,
            insurance: state.insurance.grant_access(id)?,
        };
        let group = Group::new(id, config, creator.clone(), now);
        info!(group = id, creator = %creator, model = ?group.config.model, "group created");
        state.groups.insert(id, GroupEntry { group, caps });
        Ok(id)
    }

    // --- membership -------------------------------------------------------

    /// Join a forming group, posting the required stake. The final join
    /// activates the group.
    pub fn join(
        &self,
        group: GroupId,
        member: &MemberAddress,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.status != GroupStatus::Created {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        if entry.group.member(member).is_some() {
            return Err(LifecycleError::AlreadyMember {
                group,
                member: member.clone(),
            });
        }
        if entry.group.is_full() {
            return Err(LifecycleError::GroupFull(group));
        }
        if state.stake.is_blacklisted(member) {
            return Err(StakeError::Blacklisted(member.clone()).into());
        }
        let caps = entry.caps;
        let stake_required = entry.group.config.stake_required;
        let vault_account = state.vault_account.clone();

        if !stake_required.is_zero() {
            self.vault
                .transfer_from(member, &vault_account, stake_required)?;
            state.stake.deposit_stake(&caps.stake, member, stake_required)?;
        }
        let trust = state.stake.trust_score(member);

        let entry = state.entry_mut(group)?;
        entry.group.members.push(Member {
            address: member.clone(),
            stake_amount: stake_required,
            total_contributed: Amount::ZERO,
            net_contributed: Amount::ZERO,
            total_received: Amount::ZERO,
            trust_at_join: trust,
            joined_at: now,
            is_active: true,
            has_withdrawn: false,
        });
        debug!(group, member = %member, trust, "member joined");

        if entry.group.is_full() {
            let missing: Vec<MemberAddress> = entry
                .group
                .members
                .iter()
                .map(|m| m.address.clone())
                .filter(|a| !entry.group.payout_order.contains(a))
                .collect();
            entry.group.payout_order.extend(missing);
            entry.group.status = GroupStatus::Active;
            entry.group.current_cycle = 1;
            entry.group.cycle_start = now;
            if entry.group.config.model == GroupModel::FixedSavings {
                entry.group.maturity = Some(now.plus(entry.group.config.lock_duration_secs));
            }
            info!(
                group,
                size = entry.group.members.len(),
                "group full, activated"
            );
        }
        Ok(())
    }

    /// Override the payout rotation. Creator only, once, before activation.
    /// Members who join after the override are appended in join order.
    pub fn set_payout_order(
        &self,
        group: GroupId,
        caller: &MemberAddress,
        order: Vec<MemberAddress>,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;

        let entry = state.entry_mut(group)?;
        if entry.group.status != GroupStatus::Created {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        if caller != &entry.group.creator {
            return Err(LifecycleError::NotCreator);
        }
        if entry.group.payout_order_overridden {
            return Err(LifecycleError::PayoutOrderAlreadySet(group));
        }
        let current: BTreeSet<&MemberAddress> =
            entry.group.members.iter().map(|m| &m.address).collect();
        let proposed: BTreeSet<&MemberAddress> = order.iter().collect();
        if order.len() != entry.group.members.len() || proposed != current {
            return Err(LifecycleError::InvalidPayoutOrder);
        }
        entry.group.payout_order = order;
        entry.group.payout_order_overridden = true;
        Ok(())
    }

    // --- contributions and cycles -----------------------------------------

    /// Pay the fixed contribution for the current cycle. The premium slice
    /// funds the insurance pool, the rest lands in escrow. The last
    /// outstanding contribution resolves the cycle.
    pub fn contribute(
        &self,
        group: GroupId,
        member: &MemberAddress,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let m = entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        if m.has_withdrawn {
            return Err(LifecycleError::AlreadyWithdrawn(member.clone()));
        }
        let cycle = entry.group.current_cycle;
        let window = entry.group.config.contribution_window_secs();
        if !entry.group.cycle_start.within_window(window, now) {
            return Err(LifecycleError::WindowClosed { group, cycle });
        }
        if entry.group.has_contributed(cycle, member) {
            return Err(LifecycleError::AlreadyContributed {
                cycle,
                member: member.clone(),
            });
        }
        let caps = entry.caps;
        let amount = entry.group.config.contribution_amount;
        let premium = if entry.group.config.insurance_enabled {
            amount.bps(entry.group.config.insurance_bps)
        } else {
            Amount::ZERO
        };
        let net = amount - premium;
        let vault_account = state.vault_account.clone();

        self.vault.transfer_from(member, &vault_account, amount)?;
        if !premium.is_zero() {
            state
                .insurance
                .deposit_premium(&caps.insurance, member, premium)?;
        }
        if !net.is_zero() {
            state
                .escrow
                .deposit(&caps.escrow, net, self.adapter.as_ref())?;
        }
        state.stake.record_on_time(&caps.stake, member)?;

        let entry = state.entry_mut(group)?;
        entry.group.contributions.insert(
            (cycle, member.clone()),
            Contribution {
                amount: net,
                timestamp: now,
                status: ContributionStatus::Paid,
            },
        );
        let m = entry
            .group
            .member_mut(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        m.total_contributed = m
            .total_contributed
            .checked_add(amount)
            .ok_or(LifecycleError::Overflow)?;
        m.net_contributed = m
            .net_contributed
            .checked_add(net)
            .ok_or(LifecycleError::Overflow)?;
        entry.group.cycle_pot = entry
            .group
            .cycle_pot
            .checked_add(net)
            .ok_or(LifecycleError::Overflow)?;
        debug!(group, cycle, member = %member, amount = amount.raw(), "contribution received");

        if entry.group.outstanding() == 0 {
            Self::resolve_cycle(state, group, now)?;
        }
        Ok(())
    }

    /// Settle a member's obligation after they missed the window. Anyone
    /// may call this. Slashes the stake, draws on insurance for the
    /// shortfall when a rotational group carries it, and credits whatever
    /// was recovered to the pot.
    pub fn enforce_missed_payment(
        &self,
        group: GroupId,
        member: &MemberAddress,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let m = entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        if m.has_withdrawn {
            return Err(LifecycleError::AlreadyWithdrawn(member.clone()));
        }
        let cycle = entry.group.current_cycle;
        let window = entry.group.config.contribution_window_secs();
        if entry.group.cycle_start.within_window(window, now)
            || now < entry.group.cycle_start
        {
            return Err(LifecycleError::WindowStillOpen { group, cycle });
        }
        if entry.group.has_contributed(cycle, member) {
            return Err(LifecycleError::AlreadySettled {
                cycle,
                member: member.clone(),
            });
        }
        let caps = entry.caps;
        let missed = entry.group.config.contribution_amount;
        // Coverage exists to keep the rotational pot whole; in the savings
        // models a covered shortfall would have no recipient to protect.
        let insured = entry.group.config.insurance_enabled
            && entry.group.config.model == GroupModel::Rotational;

        let slashed = state.stake.preview_slash(group, member, missed);
        let shortfall = missed.saturating_sub(slashed);
        let covered = if insured && !shortfall.is_zero() {
            let pool_balance = state
                .insurance
                .pool(group)
                .map(|p| p.balance)
                .unwrap_or(Amount::ZERO);
            shortfall.min(pool_balance)
        } else {
            Amount::ZERO
        };
        let credit = slashed.checked_add(covered).ok_or(LifecycleError::Overflow)?;

        // Slashed collateral and coverage are cash the vault already holds;
        // crediting escrow just moves the accounting.
        if !credit.is_zero() {
            state
                .escrow
                .deposit(&caps.escrow, credit, self.adapter.as_ref())?;
        }
        let outcome = state.stake.slash(&caps.stake, member, missed)?;
        warn!(
            group,
            cycle,
            member = %member,
            slashed = outcome.slashed.raw(),
            default_count = outcome.default_count,
            blacklisted = outcome.blacklisted,
            "missed payment slashed"
        );
        if !covered.is_zero() {
            state
                .insurance
                .cover_shortfall(&caps.insurance, member, shortfall)?;
        }

        let entry = state.entry_mut(group)?;
        entry.group.contributions.insert(
            (cycle, member.clone()),
            Contribution {
                amount: credit,
                timestamp: now,
                status: if covered.is_zero() {
                    ContributionStatus::Defaulted
                } else {
                    ContributionStatus::CoveredByInsurance
                },
            },
        );
        let m = entry
            .group
            .member_mut(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        m.total_contributed = m
            .total_contributed
            .checked_add(slashed)
            .ok_or(LifecycleError::Overflow)?;
        // Only the member's own collateral becomes part of their withdrawable
        // share; covered shortfall is the pool's money and funds the pot only.
        m.net_contributed = m
            .net_contributed
            .checked_add(slashed)
            .ok_or(LifecycleError::Overflow)?;
        m.stake_amount = m.stake_amount.saturating_sub(slashed);
        entry.group.cycle_pot = entry
            .group
            .cycle_pot
            .checked_add(credit)
            .ok_or(LifecycleError::Overflow)?;

        if entry.group.outstanding() == 0 {
            Self::resolve_cycle(state, group, now)?;
        }
        Ok(())
    }

    /// Close the current cycle once every obligation is settled.
    fn resolve_cycle(
        state: &mut CoordinatorState,
        id: GroupId,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let entry = state.entry(id)?;
        match entry.group.config.model {
            GroupModel::Rotational => {
                let caps = entry.caps;
                let cycle = entry.group.current_cycle;
                let gross = entry.group.cycle_pot;
                let fee = gross.bps(entry.group.config.platform_fee_bps);
                let net = gross - fee;
                let recipient = entry
                    .group
                    .payout_order
                    .get(entry.group.next_payout_index as usize)
                    .cloned()
                    .ok_or(LifecycleError::InvalidPayoutOrder)?;

                if !gross.is_zero() {
                    state.escrow.commit_payout(&caps.escrow, gross, net)?;
                }
                let entry = state.entry_mut(id)?;
                entry.group.payouts.insert(
                    cycle,
                    Payout {
                        recipient: recipient.clone(),
                        amount: net,
                        // A pot of zero (everyone defaulted with nothing
                        // recoverable) has nothing to settle.
                        executed: gross.is_zero(),
                    },
                );
                entry.group.cycle_pot = Amount::ZERO;
                entry.group.next_payout_index += 1;
                info!(
                    group = id,
                    cycle,
                    recipient = %recipient,
                    amount = net.raw(),
                    "payout committed"
                );
                if entry.group.next_payout_index as usize >= entry.group.payout_order.len() {
                    entry.group.status = GroupStatus::Completed;
                    info!(group = id, "rotation complete, group completed");
                } else {
                    entry.group.current_cycle =
                        cycle.checked_add(1).ok_or(LifecycleError::Overflow)?;
                    entry.group.cycle_start = now;
                }
            }
            GroupModel::FixedSavings | GroupModel::EmergencyLiquidity => {
                let entry = state.entry_mut(id)?;
                entry.group.cycle_pot = Amount::ZERO;
                entry.group.current_cycle = entry
                    .group
                    .current_cycle
                    .checked_add(1)
                    .ok_or(LifecycleError::Overflow)?;
                entry.group.cycle_start = now;
                debug!(group = id, cycle = entry.group.current_cycle, "cycle advanced");
            }
        }
        Ok(())
    }

    /// Move a committed payout to its recipient. Anyone may trigger
    /// settlement; the money only ever goes to the recorded recipient.
    pub fn settle_payout(
        &self,
        group: GroupId,
        cycle: Cycle,
    ) -> Result<Amount, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        let payout = entry
            .group
            .payouts
            .get(&cycle)
            .ok_or(LifecycleError::PayoutNotFound { group, cycle })?;
        if payout.executed {
            return Err(LifecycleError::PayoutAlreadySettled { group, cycle });
        }
        let caps = entry.caps;
        let recipient = payout.recipient.clone();
        let amount = payout.amount;

        state.escrow.release_pending(
            &caps.escrow,
            &recipient,
            amount,
            self.vault.as_ref(),
            self.adapter.as_ref(),
        )?;

        let entry = state.entry_mut(group)?;
        if let Some(payout) = entry.group.payouts.get_mut(&cycle) {
            payout.executed = true;
        }
        if let Some(m) = entry.group.member_mut(&recipient) {
            m.total_received = m
                .total_received
                .checked_add(amount)
                .ok_or(LifecycleError::Overflow)?;
        }
        info!(group, cycle, recipient = %recipient, amount = amount.raw(), "payout settled");
        Ok(amount)
    }

    // --- fixed savings ----------------------------------------------------

    /// Withdraw principal plus the proportional yield slice after maturity.
    /// The group completes once every member has withdrawn.
    pub fn withdraw_matured(
        &self,
        group: GroupId,
        member: &MemberAddress,
        now: Timestamp,
    ) -> Result<Amount, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.config.model != GroupModel::FixedSavings {
            return Err(LifecycleError::UnsupportedModel { group });
        }
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let maturity = entry
            .group
            .maturity
            .ok_or(LifecycleError::UnsupportedModel { group })?;
        if now < maturity {
            return Err(LifecycleError::NotMatured(maturity));
        }
        let m = entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        if m.has_withdrawn {
            return Err(LifecycleError::AlreadyWithdrawn(member.clone()));
        }
        let caps = entry.caps;
        let principal = m.net_contributed;
        // Pro-rata over members still in; the reserve shrinks with every
        // withdrawal and the last member out drains it exactly.
        let total_net: Amount = entry
            .group
            .members
            .iter()
            .filter(|m| !m.has_withdrawn)
            .map(|m| m.net_contributed)
            .sum();
        let reserve = state
            .escrow
            .balance(group)
            .map(|b| b.yield_reserve)
            .unwrap_or(Amount::ZERO);
        let yield_slice = if principal.is_zero() {
            Amount::ZERO
        } else {
            reserve
                .mul_div(principal, total_net)
                .ok_or(LifecycleError::Overflow)?
        };

        let paid = if principal.is_zero() && yield_slice.is_zero() {
            Amount::ZERO
        } else {
            state.escrow.withdraw_with_yield(
                &caps.escrow,
                member,
                principal,
                yield_slice,
                self.vault.as_ref(),
                self.adapter.as_ref(),
            )?
        };

        let entry = state.entry_mut(group)?;
        let m = entry
            .group
            .member_mut(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        m.is_active = false;
        m.has_withdrawn = true;
        m.total_received = m
            .total_received
            .checked_add(paid)
            .ok_or(LifecycleError::Overflow)?;
        info!(group, member = %member, amount = paid.raw(), "matured withdrawal");

        if entry.group.members.iter().all(|m| m.has_withdrawn) {
            entry.group.status = GroupStatus::Completed;
            info!(group, "all members withdrawn, group completed");
        }
        Ok(paid)
    }

    /// Exit a fixed-savings group before maturity. The penalty slice of the
    /// member's savings is rerouted into the insurance pool; the rest pays
    /// out. The member keeps their seat but owes nothing further.
    pub fn early_withdraw(
        &self,
        group: GroupId,
        member: &MemberAddress,
        now: Timestamp,
    ) -> Result<Amount, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.config.model != GroupModel::FixedSavings {
            return Err(LifecycleError::UnsupportedModel { group });
        }
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let maturity = entry
            .group
            .maturity
            .ok_or(LifecycleError::UnsupportedModel { group })?;
        if now >= maturity {
            return Err(LifecycleError::AlreadyMatured);
        }
        let m = entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        if m.has_withdrawn {
            return Err(LifecycleError::AlreadyWithdrawn(member.clone()));
        }
        let caps = entry.caps;
        let saved = m.net_contributed;
        let penalty = saved.bps(entry.group.config.early_withdrawal_penalty_bps);
        let paid = saved - penalty;

        if !paid.is_zero() {
            state.escrow.withdraw(
                &caps.escrow,
                member,
                paid,
                self.vault.as_ref(),
                self.adapter.as_ref(),
            )?;
        }
        if !penalty.is_zero() {
            state.escrow.debit_principal(&caps.escrow, penalty)?;
            state
                .insurance
                .deposit_premium(&caps.insurance, member, penalty)?;
        }

        let entry = state.entry_mut(group)?;
        let m = entry
            .group
            .member_mut(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        m.is_active = false;
        m.has_withdrawn = true;
        m.total_received = m
            .total_received
            .checked_add(paid)
            .ok_or(LifecycleError::Overflow)?;
        warn!(group, member = %member, paid = paid.raw(), penalty = penalty.raw(), "early withdrawal");

        if entry.group.members.iter().all(|m| m.has_withdrawn) {
            entry.group.status = GroupStatus::Completed;
            info!(group, "all members withdrawn, group completed");
        }
        Ok(paid)
    }

    // --- lifecycle control ------------------------------------------------

    /// Freeze an active group. Creator or platform admin.
    pub fn pause(&self, group: GroupId, caller: &MemberAddress) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let admin = state.admin.clone();

        let entry = state.entry_mut(group)?;
        if caller != &entry.group.creator && caller != &admin {
            return Err(LifecycleError::NotCreatorOrAdmin);
        }
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        entry.group.status = GroupStatus::Paused;
        info!(group, caller = %caller, "group paused");
        Ok(())
    }

    /// Unfreeze a paused group. The current cycle's window restarts at
    /// `now` so members are not penalised for time spent frozen.
    pub fn resume(
        &self,
        group: GroupId,
        caller: &MemberAddress,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let admin = state.admin.clone();

        let entry = state.entry_mut(group)?;
        if caller != &entry.group.creator && caller != &admin {
            return Err(LifecycleError::NotCreatorOrAdmin);
        }
        if entry.group.status != GroupStatus::Paused {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        entry.group.status = GroupStatus::Active;
        entry.group.cycle_start = now;
        info!(group, caller = %caller, "group resumed");
        Ok(())
    }

    /// Abort a group. Stakes and net contributions become reclaimable
    /// through [`reclaim_stake`](Self::reclaim_stake) and
    /// [`reclaim_contribution`](Self::reclaim_contribution).
    pub fn cancel(&self, group: GroupId, caller: &MemberAddress) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let admin = state.admin.clone();

        let entry = state.entry_mut(group)?;
        if caller != &entry.group.creator && caller != &admin {
            return Err(LifecycleError::NotCreatorOrAdmin);
        }
        if entry.group.status.is_terminal() {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        entry.group.status = GroupStatus::Cancelled;
        warn!(group, caller = %caller, "group cancelled");
        Ok(())
    }

    /// Reclaim posted stake once the group is completed or cancelled.
    pub fn reclaim_stake(
        &self,
        group: GroupId,
        member: &MemberAddress,
    ) -> Result<Amount, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if !entry.group.status.is_terminal() {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        let caps = entry.caps;
        let amount = state.stake.stake_amount(group, member);
        if amount.is_zero() {
            return Err(LifecycleError::NothingToReclaim(member.clone()));
        }

        self.vault.transfer(member, amount)?;
        state.stake.withdraw_stake(&caps.stake, member, amount)?;

        let entry = state.entry_mut(group)?;
        if let Some(m) = entry.group.member_mut(member) {
            m.stake_amount = Amount::ZERO;
        }
        info!(group, member = %member, amount = amount.raw(), "stake reclaimed");
        Ok(amount)
    }

    /// Refund net contributions after cancellation: what the member paid in
    /// minus what they already received, bounded by the principal escrow
    /// still holds.
    pub fn reclaim_contribution(
        &self,
        group: GroupId,
        member: &MemberAddress,
    ) -> Result<Amount, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.status != GroupStatus::Cancelled {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let m = entry
            .group
            .member(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        if m.has_withdrawn {
            return Err(LifecycleError::AlreadyWithdrawn(member.clone()));
        }
        let caps = entry.caps;
        let principal = state
            .escrow
            .balance(group)
            .map(|b| b.principal)
            .unwrap_or(Amount::ZERO);
        let refund = m
            .net_contributed
            .saturating_sub(m.total_received)
            .min(principal);

        if !refund.is_zero() {
            state.escrow.withdraw(
                &caps.escrow,
                member,
                refund,
                self.vault.as_ref(),
                self.adapter.as_ref(),
            )?;
        }

        let entry = state.entry_mut(group)?;
        let m = entry
            .group
            .member_mut(member)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: member.clone(),
            })?;
        m.is_active = false;
        m.has_withdrawn = true;
        m.total_received = m
            .total_received
            .checked_add(refund)
            .ok_or(LifecycleError::Overflow)?;
        info!(group, member = %member, amount = refund.raw(), "contribution refunded");
        Ok(refund)
    }

    // --- yield ------------------------------------------------------------

    /// Realise accrued yield: the group share lands in the escrow reserve,
    /// the insurance share in the premium pool.
    pub fn harvest_yield(&self, group: GroupId) -> Result<HarvestSplit, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let state = &mut *state;

        let entry = state.entry(group)?;
        if entry.group.status != GroupStatus::Active {
            return Err(LifecycleError::InvalidStatus {
                group,
                status: entry.group.status,
            });
        }
        let caps = entry.caps;

        let split = state
            .escrow
            .harvest_yield(&caps.escrow, self.adapter.as_ref())?;
        if !split.insurance_share.is_zero() {
            state
                .insurance
                .deposit_yield_share(&caps.insurance, split.insurance_share)?;
        }
        if !split.group_share.is_zero() {
            info!(
                group,
                group_share = split.group_share.raw(),
                insurance_share = split.insurance_share.raw(),
                "yield harvested"
            );
        }
        Ok(split)
    }

    // --- insurance claims -------------------------------------------------

    /// File an insurance claim. Claimant must be a member of the group.
    pub fn submit_claim(
        &self,
        group: GroupId,
        claimant: &MemberAddress,
        amount: Amount,
        evidence: impl Into<String>,
        now: Timestamp,
    ) -> Result<ClaimId, LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;

        state
            .entry(group)?
            .group
            .member(claimant)
            .ok_or_else(|| LifecycleError::NotAMember {
                group,
                member: claimant.clone(),
            })?;
        let id = state
            .insurance
            .submit_claim(group, claimant, amount, evidence, now)?;
        info!(group, claim = id, claimant = %claimant, amount = amount.raw(), "claim submitted");
        Ok(id)
    }

    /// Record a processor's approval vote.
    pub fn approve_claim(
        &self,
        processor: &MemberAddress,
        claim: ClaimId,
        revised_amount: Option<Amount>,
        now: Timestamp,
    ) -> Result<ClaimStatus, LifecycleError> {
        let _token = self.enter(REGISTRY_SLOT)?;
        let mut state = self.state_mut(REGISTRY_SLOT)?;
        let status = state
            .insurance
            .approve_claim(processor, claim, revised_amount, now)?;
        if status == ClaimStatus::Approved {
            info!(claim, "claim approved");
        }
        Ok(status)
    }

    /// Reject a claim; terminal.
    pub fn reject_claim(
        &self,
        processor: &MemberAddress,
        claim: ClaimId,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(REGISTRY_SLOT)?;
        let mut state = self.state_mut(REGISTRY_SLOT)?;
        state.insurance.reject_claim(processor, claim, now)?;
        info!(claim, "claim rejected");
        Ok(())
    }

    /// Pay out an approved claim from its group's premium pool.
    pub fn execute_claim_payout(
        &self,
        claim: ClaimId,
        now: Timestamp,
    ) -> Result<Amount, LifecycleError> {
        let group = {
            let state = self
                .inner
                .try_borrow()
                .map_err(|_| LifecycleError::Reentrancy(REGISTRY_SLOT))?;
            state
                .insurance
                .claim(claim)
                .ok_or(susu_insurance::InsuranceError::ClaimNotFound(claim))?
                .group
        };
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        let paid = state
            .insurance
            .execute_claim_payout(claim, self.vault.as_ref(), now)?;
        info!(group, claim, amount = paid.raw(), "claim paid");
        Ok(paid)
    }

    // --- platform administration ------------------------------------------

    /// Withdraw accumulated platform fees; admin only (checked by escrow).
    pub fn withdraw_platform_fees(
        &self,
        caller: &MemberAddress,
        to: &MemberAddress,
        amount: Amount,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(REGISTRY_SLOT)?;
        let mut state = self.state_mut(REGISTRY_SLOT)?;
        state.escrow.withdraw_fees(
            caller,
            to,
            amount,
            self.vault.as_ref(),
            self.adapter.as_ref(),
        )?;
        info!(to = %to, amount = amount.raw(), "platform fees withdrawn");
        Ok(())
    }

    /// Toggle a group's emergency claim cap; admin only (checked by the
    /// insurance ledger).
    pub fn set_emergency_mode(
        &self,
        caller: &MemberAddress,
        group: GroupId,
        enabled: bool,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        state.insurance.set_emergency_mode(caller, group, enabled)?;
        warn!(group, enabled, "emergency mode toggled");
        Ok(())
    }

    /// Clear a member's blacklist flag; admin only (checked by the stake
    /// ledger). History stays.
    pub fn whitelist(
        &self,
        caller: &MemberAddress,
        member: &MemberAddress,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(REGISTRY_SLOT)?;
        let mut state = self.state_mut(REGISTRY_SLOT)?;
        state.stake.whitelist(caller, member)?;
        info!(member = %member, "member whitelisted");
        Ok(())
    }

    /// Admin-gated withdrawal from a group's insurance reserve.
    pub fn emergency_withdraw_reserve(
        &self,
        caller: &MemberAddress,
        group: GroupId,
        to: &MemberAddress,
        amount: Amount,
    ) -> Result<(), LifecycleError> {
        let _token = self.enter(group)?;
        let mut state = self.state_mut(group)?;
        state
            .insurance
            .emergency_withdraw_reserve(caller, group, to, amount, self.vault.as_ref())?;
        warn!(group, to = %to, amount = amount.raw(), "insurance reserve withdrawn");
        Ok(())
    }

    // --- queries ----------------------------------------------------------

    pub fn group(&self, id: GroupId) -> Option<Group> {
        self.inner
            .try_borrow()
            .ok()
            .and_then(|s| s.groups.get(&id).map(|e| e.group.clone()))
    }

    pub fn trust_score(&self, member: &MemberAddress) -> u16 {
        self.inner
            .try_borrow()
            .map(|s| s.stake.trust_score(member))
            .unwrap_or_default()
    }

    pub fn is_blacklisted(&self, member: &MemberAddress) -> bool {
        self.inner
            .try_borrow()
            .map(|s| s.stake.is_blacklisted(member))
            .unwrap_or(false)
    }

    pub fn stake_amount(&self, group: GroupId, member: &MemberAddress) -> Amount {
        self.inner
            .try_borrow()
            .map(|s| s.stake.stake_amount(group, member))
            .unwrap_or(Amount::ZERO)
    }

    pub fn escrow_balance(&self, group: GroupId) -> Option<susu_escrow::EscrowBalance> {
        self.inner
            .try_borrow()
            .ok()
            .and_then(|s| s.escrow.balance(group).cloned())
    }

    pub fn premium_pool(&self, group: GroupId) -> Option<susu_insurance::PremiumPool> {
        self.inner
            .try_borrow()
            .ok()
            .and_then(|s| s.insurance.pool(group).cloned())
    }

    pub fn claim(&self, id: ClaimId) -> Option<susu_insurance::InsuranceClaim> {
        self.inner
            .try_borrow()
            .ok()
            .and_then(|s| s.insurance.claim(id).cloned())
    }

    pub fn platform_fees(&self) -> Amount {
        self.inner
            .try_borrow()
            .map(|s| s.escrow.platform_fees())
            .unwrap_or(Amount::ZERO)
    }

    /// Global cash position: (on hand, deployed).
    pub fn cash_position(&self) -> (Amount, Amount) {
        self.inner
            .try_borrow()
            .map(|s| (s.escrow.on_hand(), s.escrow.deployed()))
            .unwrap_or((Amount::ZERO, Amount::ZERO))
    }
}

impl GroupCoordinator {
    /// Persist all protocol state.
    pub fn save_to_store(
        &self,
        groups: &dyn GroupStore,
        stakes: &dyn StakeStore,
        escrows: &dyn EscrowStore,
        insurances: &dyn InsuranceStore,
    ) -> Result<(), LifecycleError> {
        let state = self
            .inner
            .try_borrow()
            .map_err(|_| LifecycleError::Reentrancy(REGISTRY_SLOT))?;

        let meta = bincode::serialize(&state.next_group_id)
            .map_err(|e| LifecycleError::Store(e.to_string()))?;
        groups
            .put_meta(b"registry", &meta)
            .map_err(|e| LifecycleError::Store(e.to_string()))?;
        for (id, entry) in &state.groups {
            let bytes = bincode::serialize(entry)
                .map_err(|e| LifecycleError::Store(e.to_string()))?;
            groups
                .put_group(*id, &bytes)
                .map_err(|e| LifecycleError::Store(e.to_string()))?;
        }

        state.stake.save_to_store(stakes)?;
        state.escrow.save_to_store(escrows)?;
        state.insurance.save_to_store(insurances)?;
        Ok(())
    }

    /// Restore the protocol from its stores.
    #[allow(clippy::too_many_arguments)]
    pub fn load_from_store(
        params: ProtocolParams,
        admin: MemberAddress,
        vault_account: MemberAddress,
        processors: impl IntoIterator<Item = MemberAddress>,
        vault: Rc<dyn ValueTransfer>,
        adapter: Rc<dyn YieldAdapter>,
        groups: &dyn GroupStore,
        stakes: &dyn StakeStore,
        escrows: &dyn EscrowStore,
        insurances: &dyn InsuranceStore,
    ) -> Result<Self, LifecycleError> {
        let stake = StakeLedger::load_from_store(params.clone(), admin.clone(), stakes)?;
        let escrow = EscrowLedger::load_from_store(params.clone(), admin.clone(), escrows)?;
        let insurance =
            InsuranceLedger::load_from_store(params, admin.clone(), processors, insurances)?;

        let mut state = CoordinatorState {
            admin,
            vault_account,
            next_group_id: 1,
            groups: HashMap::new(),
            stake,
            escrow,
            insurance,
        };
        if let Some(bytes) = groups
            .get_meta(b"registry")
            .map_err(|e| LifecycleError::Store(e.to_string()))?
        {
            state.next_group_id = bincode::deserialize(&bytes)
                .map_err(|e| LifecycleError::Store(e.to_string()))?;
        }
        for (id, bytes) in groups
            .iter_groups()
            .map_err(|e| LifecycleError::Store(e.to_string()))?
        {
            let entry: GroupEntry = bincode::deserialize(&bytes)
                .map_err(|e| LifecycleError::Store(e.to_string()))?;
            state.groups.insert(id, entry);
        }

        Ok(Self {
            inner: Rc::new(RefCell::new(state)),
            guard: ReentrancyGuard::new(),
            vault,
            adapter,
        })
    }
}
