//! Core insurance ledger engine.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use susu_types::{
    Amount, Capability, ClaimId, GroupId, MemberAddress, ProtocolParams, Timestamp, ValueTransfer,
};

use crate::claim::{ClaimStatus, InsuranceClaim};
use crate::error::InsuranceError;

/// Per-group premium accounting.
///
/// `balance` is the claimable pool; `reserve` is the solvency cushion
/// earmarked on every premium and untouchable by claims. The two buckets
/// never overlap, so no premium unit backs more than one payout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumPool {
    pub balance: Amount,
    pub reserve: Amount,
    pub total_premiums: Amount,
    pub total_claims_paid: Amount,
    pub total_shortfall_covered: Amount,
    /// Tightens the claim cap to the emergency cap while set.
    pub emergency_mode: bool,
    /// Premiums attributed per paying member, for claim vetting context.
    pub member_premiums: HashMap<MemberAddress, Amount>,
}

/// The insurance ledger: premium pools, reserve funds and the claim
/// approval workflow.
pub struct InsuranceLedger {
    params: ProtocolParams,
    admin: MemberAddress,
    /// Fixed at construction; processors vote on claims.
    processors: BTreeSet<MemberAddress>,
    next_token: u64,
    grants: HashMap<GroupId, u64>,
    pools: HashMap<GroupId, PremiumPool>,
    next_claim_id: ClaimId,
    claims: HashMap<ClaimId, InsuranceClaim>,
    last_claim_at: HashMap<(GroupId, MemberAddress), Timestamp>,
}

impl InsuranceLedger {
    pub fn new(
        params: ProtocolParams,
        admin: MemberAddress,
        processors: impl IntoIterator<Item = MemberAddress>,
    ) -> Self {
        Self {
            params,
            admin,
            processors: processors.into_iter().collect(),
            next_token: 1,
            grants: HashMap::new(),
            pools: HashMap::new(),
            next_claim_id: 1,
            claims: HashMap::new(),
            last_claim_at: HashMap::new(),
        }
    }

    /// Issue the capability for a group and open its (empty) pool.
    pub fn grant_access(&mut self, group: GroupId) -> Result<Capability, InsuranceError> {
        if self.grants.contains_key(&group) {
            return Err(InsuranceError::AlreadyGranted(group));
        }
        let token = self.next_token;
        self.next_token = self
            .next_token
            .checked_add(1)
            .ok_or(InsuranceError::Overflow)?;
        self.grants.insert(group, token);
        self.pools.insert(group, PremiumPool::default());
        Ok(Capability::issue(group, token))
    }

    fn verify(&self, cap: &Capability) -> Result<GroupId, InsuranceError> {
        match self.grants.get(&cap.group()) {
            Some(token) if *token == cap.token() => Ok(cap.group()),
            _ => Err(InsuranceError::AccessDenied(cap.group())),
        }
    }

    fn pool_mut(&mut self, group: GroupId) -> Result<&mut PremiumPool, InsuranceError> {
        self.pools
            .get_mut(&group)
            .ok_or(InsuranceError::PoolNotFound(group))
    }

    /// Credit a premium: the reserve slice is earmarked first, the rest
    /// lands in the claimable balance.
    pub fn deposit_premium(
        &mut self,
        cap: &Capability,
        payer: &MemberAddress,
        amount: Amount,
    ) -> Result<(), InsuranceError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(InsuranceError::ZeroAmount);
        }
        let reserve_bps = self.params.insurance_reserve_bps;
        let pool = self.pool_mut(group)?;
        let reserve_slice = amount.bps(reserve_bps);
        let claimable = amount - reserve_slice;

        let new_reserve = pool
            .reserve
            .checked_add(reserve_slice)
            .ok_or(InsuranceError::Overflow)?;
        let new_balance = pool
            .balance
            .checked_add(claimable)
            .ok_or(InsuranceError::Overflow)?;
        let new_total = pool
            .total_premiums
            .checked_add(amount)
            .ok_or(InsuranceError::Overflow)?;
        let new_attributed = pool
            .member_premiums
            .get(payer)
            .copied()
            .unwrap_or(Amount::ZERO)
            .checked_add(amount)
            .ok_or(InsuranceError::Overflow)?;

        pool.reserve = new_reserve;
        pool.balance = new_balance;
        pool.total_premiums = new_total;
        pool.member_premiums.insert(payer.clone(), new_attributed);
        Ok(())
    }

    /// Credit a harvest's insurance share. Same reserve split as a premium
    /// but without attributing the funds to any member.
    pub fn deposit_yield_share(
        &mut self,
        cap: &Capability,
        amount: Amount,
    ) -> Result<(), InsuranceError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(InsuranceError::ZeroAmount);
        }
        let reserve_bps = self.params.insurance_reserve_bps;
        let pool = self.pool_mut(group)?;
        let reserve_slice = amount.bps(reserve_bps);
        let claimable = amount - reserve_slice;

        let new_reserve = pool
            .reserve
            .checked_add(reserve_slice)
            .ok_or(InsuranceError::Overflow)?;
        let new_balance = pool
            .balance
            .checked_add(claimable)
            .ok_or(InsuranceError::Overflow)?;
        let new_total = pool
            .total_premiums
            .checked_add(amount)
            .ok_or(InsuranceError::Overflow)?;

        pool.reserve = new_reserve;
        pool.balance = new_balance;
        pool.total_premiums = new_total;
        Ok(())
    }

    /// Toggle emergency mode for a group; admin only.
    pub fn set_emergency_mode(
        &mut self,
        caller: &MemberAddress,
        group: GroupId,
        enabled: bool,
    ) -> Result<(), InsuranceError> {
        if caller != &self.admin {
            return Err(InsuranceError::NotAdmin);
        }
        self.pool_mut(group)?.emergency_mode = enabled;
        Ok(())
    }

    /// File a claim against a group's pool.
    pub fn submit_claim(
        &mut self,
        group: GroupId,
        claimant: &MemberAddress,
        amount: Amount,
        evidence: impl Into<String>,
        now: Timestamp,
    ) -> Result<ClaimId, InsuranceError> {
        let pool = self
            .pools
            .get(&group)
            .ok_or(InsuranceError::PoolNotFound(group))?;
        if amount.is_zero() {
            return Err(InsuranceError::ZeroAmount);
        }
        let cap = if pool.emergency_mode {
            self.params.emergency_claim_cap
        } else {
            self.params.claim_cap
        };
        if amount > cap {
            return Err(InsuranceError::ClaimTooLarge {
                requested: amount.raw(),
                cap: cap.raw(),
            });
        }
        if let Some(last) = self.last_claim_at.get(&(group, claimant.clone())) {
            if !last.has_expired(self.params.claim_cooldown_secs, now) {
                let elapsed = last.elapsed_since(now);
                return Err(InsuranceError::CooldownActive {
                    remaining_secs: self.params.claim_cooldown_secs - elapsed,
                });
            }
        }

        let id = self.next_claim_id;
        self.next_claim_id = self
            .next_claim_id
            .checked_add(1)
            .ok_or(InsuranceError::Overflow)?;
        self.claims.insert(
            id,
            InsuranceClaim::new(id, group, claimant.clone(), amount, evidence.into(), now),
        );
        self.last_claim_at.insert((group, claimant.clone()), now);
        Ok(id)
    }

    /// Record one processor's approval vote. `revised_amount` lets an
    /// approver cut the payout down; it can never raise it. The claim
    /// auto-approves once the distinct-vote threshold is reached.
    pub fn approve_claim(
        &mut self,
        processor: &MemberAddress,
        claim_id: ClaimId,
        revised_amount: Option<Amount>,
        now: Timestamp,
    ) -> Result<ClaimStatus, InsuranceError> {
        if !self.processors.contains(processor) {
            return Err(InsuranceError::NotProcessor);
        }
        let threshold = self.params.claim_approval_threshold;
        let claim = self
            .claims
            .get_mut(&claim_id)
            .ok_or(InsuranceError::ClaimNotFound(claim_id))?;
        if claim.status != ClaimStatus::Submitted {
            return Err(InsuranceError::InvalidStatus {
                claim: claim_id,
                status: claim.status,
            });
        }
        if let Some(revised) = revised_amount {
            if revised.is_zero() {
                return Err(InsuranceError::ZeroAmount);
            }
            if revised > claim.amount {
                return Err(InsuranceError::AmountIncreased);
            }
            claim.amount = revised;
        }
        if !claim.approvals.insert(processor.clone()) {
            return Err(InsuranceError::DuplicateApproval(claim_id));
        }
        if claim.approvals.len() as u32 >= threshold {
            claim.status = ClaimStatus::Approved;
            claim.processed_at = Some(now);
        }
        Ok(claim.status)
    }

    /// Reject a claim; terminal, and any single processor may do it.
    pub fn reject_claim(
        &mut self,
        processor: &MemberAddress,
        claim_id: ClaimId,
        now: Timestamp,
    ) -> Result<(), InsuranceError> {
        if !self.processors.contains(processor) {
            return Err(InsuranceError::NotProcessor);
        }
        let claim = self
            .claims
            .get_mut(&claim_id)
            .ok_or(InsuranceError::ClaimNotFound(claim_id))?;
        if claim.status != ClaimStatus::Submitted {
            return Err(InsuranceError::InvalidStatus {
                claim: claim_id,
                status: claim.status,
            });
        }
        claim.status = ClaimStatus::Rejected;
        claim.processed_at = Some(now);
        Ok(())
    }

    /// Pay out an approved claim. Validates the pool can cover it, moves the
    /// asset, then commits the debit and the `Paid` transition.
    pub fn execute_claim_payout(
        &mut self,
        claim_id: ClaimId,
        vault: &dyn ValueTransfer,
        now: Timestamp,
    ) -> Result<Amount, InsuranceError> {
        let claim = self
            .claims
            .get(&claim_id)
            .ok_or(InsuranceError::ClaimNotFound(claim_id))?;
        if claim.status != ClaimStatus::Approved {
            return Err(InsuranceError::InvalidStatus {
                claim: claim_id,
                status: claim.status,
            });
        }
        let group = claim.group;
        let amount = claim.amount;
        let claimant = claim.claimant.clone();
        let pool = self
            .pools
            .get(&group)
            .ok_or(InsuranceError::PoolNotFound(group))?;
        if pool.balance < amount {
            return Err(InsuranceError::InsufficientPool {
                needed: amount.raw(),
                available: pool.balance.raw(),
            });
        }

        vault.transfer(&claimant, amount)?;

        let pool = self.pool_mut(group)?;
        pool.balance = pool.balance.saturating_sub(amount);
        pool.total_claims_paid = pool
            .total_claims_paid
            .checked_add(amount)
            .ok_or(InsuranceError::Overflow)?;
        let claim = self
            .claims
            .get_mut(&claim_id)
            .ok_or(InsuranceError::ClaimNotFound(claim_id))?;
        claim.status = ClaimStatus::Paid;
        claim.processed_at = Some(now);
        Ok(amount)
    }

    /// Cover a missed-payment shortfall from the claimable pool. Returns the
    /// covered amount, which is the shortfall bounded by the pool balance, and
    /// the coverage is a real debit, not a bookkeeping label.
    pub fn cover_shortfall(
        &mut self,
        cap: &Capability,
        member: &MemberAddress,
        shortfall: Amount,
    ) -> Result<Amount, InsuranceError> {
        let group = self.verify(cap)?;
        if shortfall.is_zero() {
            return Err(InsuranceError::ZeroAmount);
        }
        let _ = member; // recorded by the lifecycle's contribution entry
        let pool = self.pool_mut(group)?;
        let covered = shortfall.min(pool.balance);
        pool.balance = pool.balance.saturating_sub(covered);
        pool.total_shortfall_covered = pool
            .total_shortfall_covered
            .checked_add(covered)
            .ok_or(InsuranceError::Overflow)?;
        Ok(covered)
    }

    /// Admin-gated withdrawal from the reserve cushion. Separate from claim
    /// payouts; the claimable balance is never touched here.
    pub fn emergency_withdraw_reserve(
        &mut self,
        caller: &MemberAddress,
        group: GroupId,
        to: &MemberAddress,
        amount: Amount,
        vault: &dyn ValueTransfer,
    ) -> Result<(), InsuranceError> {
        if caller != &self.admin {
            return Err(InsuranceError::NotAdmin);
        }
        if amount.is_zero() {
            return Err(InsuranceError::ZeroAmount);
        }
        let pool = self
            .pools
            .get(&group)
            .ok_or(InsuranceError::PoolNotFound(group))?;
        if pool.reserve < amount {
            return Err(InsuranceError::InsufficientReserve {
                needed: amount.raw(),
                available: pool.reserve.raw(),
            });
        }

        vault.transfer(to, amount)?;

        let pool = self.pool_mut(group)?;
        pool.reserve = pool.reserve.saturating_sub(amount);
        Ok(())
    }

    pub fn pool(&self, group: GroupId) -> Option<&PremiumPool> {
        self.pools.get(&group)
    }

    pub fn claim(&self, claim_id: ClaimId) -> Option<&InsuranceClaim> {
        self.claims.get(&claim_id)
    }

    /// All claims ever filed against a group, oldest first.
    pub fn claims_for_group(&self, group: GroupId) -> Vec<&InsuranceClaim> {
        let mut claims: Vec<_> = self
            .claims
            .values()
            .filter(|c| c.group == group)
            .collect();
        claims.sort_by_key(|c| c.id);
        claims
    }
}

impl InsuranceLedger {
    /// Persist all ledger state to an insurance store.
    pub fn save_to_store(
        &self,
        store: &dyn susu_store::InsuranceStore,
    ) -> Result<(), InsuranceError> {
        let meta = (
            self.next_token,
            self.grants.clone(),
            self.next_claim_id,
            self.last_claim_at.clone(),
        );
        let bytes = bincode::serialize(&meta).map_err(|e| InsuranceError::Store(e.to_string()))?;
        store
            .put_meta(b"insurance_ledger", &bytes)
            .map_err(|e| InsuranceError::Store(e.to_string()))?;

        for (group, pool) in &self.pools {
            let bytes =
                bincode::serialize(pool).map_err(|e| InsuranceError::Store(e.to_string()))?;
            store
                .put_pool(*group, &bytes)
                .map_err(|e| InsuranceError::Store(e.to_string()))?;
        }
        for (id, claim) in &self.claims {
            let bytes =
                bincode::serialize(claim).map_err(|e| InsuranceError::Store(e.to_string()))?;
            store
                .put_claim(*id, claim.group, &bytes)
                .map_err(|e| InsuranceError::Store(e.to_string()))?;
        }
        Ok(())
    }

    /// Restore ledger state from an insurance store.
    pub fn load_from_store(
        params: ProtocolParams,
        admin: MemberAddress,
        processors: impl IntoIterator<Item = MemberAddress>,
        store: &dyn susu_store::InsuranceStore,
    ) -> Result<Self, InsuranceError> {
        let mut ledger = Self::new(params, admin, processors);

        if let Some(bytes) = store
            .get_meta(b"insurance_ledger")
            .map_err(|e| InsuranceError::Store(e.to_string()))?
        {
            type Meta = (
                u64,
                HashMap<GroupId, u64>,
                ClaimId,
                HashMap<(GroupId, MemberAddress), Timestamp>,
            );
            let (next_token, grants, next_claim_id, last_claim_at): Meta =
                bincode::deserialize(&bytes).map_err(|e| InsuranceError::Store(e.to_string()))?;
            ledger.next_token = next_token;
            ledger.grants = grants;
            ledger.next_claim_id = next_claim_id;
            ledger.last_claim_at = last_claim_at;
        }

        for (group, _) in ledger.grants.clone() {
            if let Some(bytes) = store
                .get_pool(group)
                .map_err(|e| InsuranceError::Store(e.to_string()))?
            {
                let pool: PremiumPool = bincode::deserialize(&bytes)
                    .map_err(|e| InsuranceError::Store(e.to_string()))?;
                ledger.pools.insert(group, pool);
            }
            for (id, bytes) in store
                .scan_group_claims(group)
                .map_err(|e| InsuranceError::Store(e.to_string()))?
            {
                let claim: InsuranceClaim = bincode::deserialize(&bytes)
                    .map_err(|e| InsuranceError::Store(e.to_string()))?;
                ledger.claims.insert(id, claim);
            }
        }
        Ok(ledger)
    }
}
