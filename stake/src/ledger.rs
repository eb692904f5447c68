//! Core stake ledger engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use susu_types::{Amount, Capability, GroupId, MemberAddress, ProtocolParams};

use crate::error::StakeError;

/// Collateral posted by one member in one group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub amount: Amount,
    /// Missed payments this member has been slashed for in this group.
    pub default_count: u32,
}

/// Platform-wide reputation for one member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Bounded to `[0, trust_max]`.
    pub score: u16,
    /// Sticky once the default threshold is reached in any group; only an
    /// admin whitelist clears it. Default counts and trust are never reset.
    pub blacklisted: bool,
}

/// What a slash did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlashOutcome {
    /// Actual deduction: `min(stake × penalty_bps, missed, stake)`.
    pub slashed: Amount,
    pub default_count: u32,
    pub blacklisted: bool,
}

/// The stake ledger: collateral, slashing and trust, keyed per
/// (group, member) with trust scores shared platform-wide.
pub struct StakeLedger {
    params: ProtocolParams,
    admin: MemberAddress,
    next_token: u64,
    grants: HashMap<GroupId, u64>,
    records: HashMap<(GroupId, MemberAddress), StakeRecord>,
    trust: HashMap<MemberAddress, TrustRecord>,
}

impl StakeLedger {
    pub fn new(params: ProtocolParams, admin: MemberAddress) -> Self {
        Self {
            params,
            admin,
            next_token: 1,
            grants: HashMap::new(),
            records: HashMap::new(),
            trust: HashMap::new(),
        }
    }

    /// Issue the capability for a group. Called once per group by the
    /// registry at wiring time.
    pub fn grant_access(&mut self, group: GroupId) -> Result<Capability, StakeError> {
        if self.grants.contains_key(&group) {
            return Err(StakeError::AlreadyGranted(group));
        }
        let token = self.next_token;
        self.next_token = self.next_token.checked_add(1).ok_or(StakeError::Overflow)?;
        self.grants.insert(group, token);
        Ok(Capability::issue(group, token))
    }

    fn verify(&self, cap: &Capability) -> Result<GroupId, StakeError> {
        match self.grants.get(&cap.group()) {
            Some(token) if *token == cap.token() => Ok(cap.group()),
            _ => Err(StakeError::AccessDenied(cap.group())),
        }
    }

    /// Lock collateral for a member joining a group. Blacklisted members are
    /// refused here, which is what blocks them from joining anywhere.
    pub fn deposit_stake(
        &mut self,
        cap: &Capability,
        member: &MemberAddress,
        amount: Amount,
    ) -> Result<(), StakeError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount);
        }
        if self.is_blacklisted(member) {
            return Err(StakeError::Blacklisted(member.clone()));
        }
        let record = self
            .records
            .entry((group, member.clone()))
            .or_default();
        record.amount = record
            .amount
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        let initial = self.params.trust_initial;
        self.trust
            .entry(member.clone())
            .or_insert(TrustRecord {
                score: initial,
                blacklisted: false,
            });
        Ok(())
    }

    /// Release collateral back to a member (group completion, cancellation).
    pub fn withdraw_stake(
        &mut self,
        cap: &Capability,
        member: &MemberAddress,
        amount: Amount,
    ) -> Result<(), StakeError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount);
        }
        let record = self
            .records
            .get_mut(&(group, member.clone()))
            .ok_or_else(|| StakeError::RecordNotFound {
                group,
                member: member.clone(),
            })?;
        record.amount = record.amount.checked_sub(amount).ok_or_else(|| {
            StakeError::InsufficientStake {
                needed: amount.raw(),
                available: record.amount.raw(),
            }
        })?;
        Ok(())
    }

    /// Slash a member for a missed payment of `missed`.
    ///
    /// The deduction is bounded three ways: by the penalty fraction of the
    /// stake, by the missed amount, and by the stake itself, so it can never
    /// take the stake negative. Also applies the negative trust step and
    /// flips the blacklist flag once the default threshold is reached.
    /// A member with no collateral posted still accrues the default and the
    /// trust penalty; only the deduction is zero.
    pub fn slash(
        &mut self,
        cap: &Capability,
        member: &MemberAddress,
        missed: Amount,
    ) -> Result<SlashOutcome, StakeError> {
        let group = self.verify(cap)?;
        if missed.is_zero() {
            return Err(StakeError::ZeroAmount);
        }
        let slashed = self.preview_slash(group, member, missed);
        let record = self
            .records
            .entry((group, member.clone()))
            .or_default();
        record.amount = record.amount.saturating_sub(slashed);
        record.default_count = record
            .default_count
            .checked_add(1)
            .ok_or(StakeError::Overflow)?;
        let default_count = record.default_count;

        let initial = self.params.trust_initial;
        let trust = self
            .trust
            .entry(member.clone())
            .or_insert(TrustRecord {
                score: initial,
                blacklisted: false,
            });
        trust.score = trust.score.saturating_sub(self.params.trust_slash_step);
        if default_count >= self.params.blacklist_threshold {
            trust.blacklisted = true;
        }

        Ok(SlashOutcome {
            slashed,
            default_count,
            blacklisted: trust.blacklisted,
        })
    }

    /// What `slash` would deduct right now, without touching anything.
    /// Lets callers sequence external cash movements before the slash.
    pub fn preview_slash(&self, group: GroupId, member: &MemberAddress, missed: Amount) -> Amount {
        let stake = self.stake_amount(group, member);
        let penalty = stake.bps(self.params.stake_penalty_bps);
        penalty.min(missed).min(stake)
    }

    /// Reward an on-time cycle contribution with the positive trust step,
    /// capped at the trust ceiling.
    pub fn record_on_time(
        &mut self,
        cap: &Capability,
        member: &MemberAddress,
    ) -> Result<u16, StakeError> {
        self.verify(cap)?;
        let initial = self.params.trust_initial;
        let max = self.params.trust_max;
        let step = self.params.trust_reward_step;
        let trust = self
            .trust
            .entry(member.clone())
            .or_insert(TrustRecord {
                score: initial,
                blacklisted: false,
            });
        trust.score = trust.score.saturating_add(step).min(max);
        Ok(trust.score)
    }

    /// Clear a member's blacklist flag. Admin only; default counts and trust
    /// scores stay exactly as they were.
    pub fn whitelist(
        &mut self,
        caller: &MemberAddress,
        member: &MemberAddress,
    ) -> Result<(), StakeError> {
        if caller != &self.admin {
            return Err(StakeError::NotAdmin);
        }
        if let Some(trust) = self.trust.get_mut(member) {
            trust.blacklisted = false;
        }
        Ok(())
    }

    /// Current trust score; members the ledger has never seen sit at the
    /// initial score.
    pub fn trust_score(&self, member: &MemberAddress) -> u16 {
        self.trust
            .get(member)
            .map(|t| t.score)
            .unwrap_or(self.params.trust_initial)
    }

    pub fn is_blacklisted(&self, member: &MemberAddress) -> bool {
        self.trust.get(member).is_some_and(|t| t.blacklisted)
    }

    pub fn stake_amount(&self, group: GroupId, member: &MemberAddress) -> Amount {
        self.records
            .get(&(group, member.clone()))
            .map(|r| r.amount)
            .unwrap_or(Amount::ZERO)
    }

    pub fn record(&self, group: GroupId, member: &MemberAddress) -> Option<&StakeRecord> {
        self.records.get(&(group, member.clone()))
    }
}

impl StakeLedger {
    /// Persist all ledger state to a stake store.
    pub fn save_to_store(&self, store: &dyn susu_store::StakeStore) -> Result<(), StakeError> {
        let meta = (self.next_token, self.grants.clone());
        let bytes = bincode::serialize(&meta).map_err(|e| StakeError::Store(e.to_string()))?;
        store
            .put_meta(b"stake_ledger", &bytes)
            .map_err(|e| StakeError::Store(e.to_string()))?;

        for ((group, member), record) in &self.records {
            let bytes =
                bincode::serialize(record).map_err(|e| StakeError::Store(e.to_string()))?;
            store
                .put_stake(*group, member, &bytes)
                .map_err(|e| StakeError::Store(e.to_string()))?;
        }
        for (member, trust) in &self.trust {
            let bytes =
                bincode::serialize(trust).map_err(|e| StakeError::Store(e.to_string()))?;
            store
                .put_trust(member, &bytes)
                .map_err(|e| StakeError::Store(e.to_string()))?;
        }
        Ok(())
    }

    /// Restore ledger state from a stake store.
    pub fn load_from_store(
        params: ProtocolParams,
        admin: MemberAddress,
        store: &dyn susu_store::StakeStore,
    ) -> Result<Self, StakeError> {
        let mut ledger = Self::new(params, admin);

        if let Some(bytes) = store
            .get_meta(b"stake_ledger")
            .map_err(|e| StakeError::Store(e.to_string()))?
        {
            let (next_token, grants): (u64, HashMap<GroupId, u64>) =
                bincode::deserialize(&bytes).map_err(|e| StakeError::Store(e.to_string()))?;
            ledger.next_token = next_token;
            ledger.grants = grants;
        }

        for (member, bytes) in store
            .iter_trust()
            .map_err(|e| StakeError::Store(e.to_string()))?
        {
            let trust: TrustRecord =
                bincode::deserialize(&bytes).map_err(|e| StakeError::Store(e.to_string()))?;
            ledger.trust.insert(member, trust);
        }

        for (group, _) in ledger.grants.clone() {
            for (member, bytes) in store
                .scan_group_stakes(group)
                .map_err(|e| StakeError::Store(e.to_string()))?
            {
                let record: StakeRecord =
                    bincode::deserialize(&bytes).map_err(|e| StakeError::Store(e.to_string()))?;
                ledger.records.insert((group, member), record);
            }
        }
        Ok(ledger)
    }
}
