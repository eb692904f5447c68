//! Core escrow ledger engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use susu_types::{
    Amount, Capability, GroupId, MemberAddress, ProtocolParams, ValueTransfer, YieldAdapter,
};

use crate::error::EscrowError;

/// Per-group escrow buckets.
///
/// `pending_payouts` is a separate bucket so a committed payout never
/// competes with principal accounting: principal moves into pending when a
/// cycle resolves and leaves pending when the transfer lands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBalance {
    pub principal: Amount,
    pub yield_reserve: Amount,
    pub pending_payouts: Amount,
}

/// Outcome of a yield harvest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarvestSplit {
    /// Credited to the group's yield reserve.
    pub group_share: Amount,
    /// Returned to the caller for routing into the insurance pool.
    pub insurance_share: Amount,
}

/// The escrow ledger: per-group bucket accounting plus the global cash
/// position (on hand vs deployed in the yield adapter).
pub struct EscrowLedger {
    params: ProtocolParams,
    admin: MemberAddress,
    next_token: u64,
    grants: HashMap<GroupId, u64>,
    balances: HashMap<GroupId, EscrowBalance>,
    /// Settlement asset sitting in the vault account.
    on_hand: Amount,
    /// Settlement asset deployed into the yield adapter.
    deployed: Amount,
    /// Platform fees collected from payouts, withdrawable by the admin.
    platform_fees: Amount,
}

impl EscrowLedger {
    pub fn new(params: ProtocolParams, admin: MemberAddress) -> Self {
        Self {
            params,
            admin,
            next_token: 1,
            grants: HashMap::new(),
            balances: HashMap::new(),
            on_hand: Amount::ZERO,
            deployed: Amount::ZERO,
            platform_fees: Amount::ZERO,
        }
    }

    /// Issue the capability for a group and open its (empty) balance.
    pub fn grant_access(&mut self, group: GroupId) -> Result<Capability, EscrowError> {
        if self.grants.contains_key(&group) {
            return Err(EscrowError::AlreadyGranted(group));
        }
        let token = self.next_token;
        self.next_token = self.next_token.checked_add(1).ok_or(EscrowError::Overflow)?;
        self.grants.insert(group, token);
        self.balances.insert(group, EscrowBalance::default());
        Ok(Capability::issue(group, token))
    }

    fn verify(&self, cap: &Capability) -> Result<GroupId, EscrowError> {
        match self.grants.get(&cap.group()) {
            Some(token) if *token == cap.token() => Ok(cap.group()),
            _ => Err(EscrowError::AccessDenied(cap.group())),
        }
    }

    fn balance_mut(&mut self, group: GroupId) -> Result<&mut EscrowBalance, EscrowError> {
        self.balances
            .get_mut(&group)
            .ok_or(EscrowError::BalanceNotFound(group))
    }

    /// Cash above the liquidity buffer, eligible for yield deployment.
    pub fn idle_funds(&self) -> Amount {
        let buffer = self.on_hand.bps(self.params.liquidity_buffer_bps);
        self.on_hand.saturating_sub(buffer)
    }

    /// Pull deployed funds back until at least `needed` cash is on hand.
    fn ensure_cash(
        &mut self,
        needed: Amount,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        if self.on_hand >= needed {
            return Ok(());
        }
        let shortfall = needed - self.on_hand;
        if self.deployed < shortfall {
            return Err(EscrowError::InsufficientLiquidity {
                needed: needed.raw(),
                on_hand: self.on_hand.raw(),
                deployed: self.deployed.raw(),
            });
        }
        adapter.withdraw(shortfall)?;
        self.deployed = self.deployed.saturating_sub(shortfall);
        self.on_hand = self
            .on_hand
            .checked_add(shortfall)
            .ok_or(EscrowError::Overflow)?;
        Ok(())
    }

    /// Account for cash that has already landed in the vault (the caller
    /// performed the inbound transfer), then sweep idle funds.
    pub fn deposit(
        &mut self,
        cap: &Capability,
        amount: Amount,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self
            .balances
            .get(&group)
            .ok_or(EscrowError::BalanceNotFound(group))?;
        let new_principal = balance
            .principal
            .checked_add(amount)
            .ok_or(EscrowError::Overflow)?;
        let after = self.on_hand.checked_add(amount).ok_or(EscrowError::Overflow)?;
        // Everything above the buffer deploys. The sweep is best effort: a
        // refusing adapter just leaves the cash on hand, it never fails a
        // deposit whose funds have already landed in the vault.
        let buffer = after.bps(self.params.liquidity_buffer_bps);
        let idle = after.saturating_sub(buffer);
        let swept = match self.deployed.checked_add(idle) {
            Some(new_deployed) if !idle.is_zero() && adapter.deposit(idle).is_ok() => {
                self.deployed = new_deployed;
                true
            }
            _ => false,
        };
        self.balance_mut(group)?.principal = new_principal;
        self.on_hand = if swept { after.saturating_sub(idle) } else { after };
        Ok(())
    }

    /// Move principal accounting out of the group without moving cash;
    /// early-withdrawal penalties are rerouted to the insurance pool this
    /// way, and the insurance ledger picks the cash claim up.
    pub fn debit_principal(&mut self, cap: &Capability, amount: Amount) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self.balance_mut(group)?;
        if balance.principal < amount {
            return Err(EscrowError::InsufficientPrincipal {
                needed: amount.raw(),
                available: balance.principal.raw(),
            });
        }
        balance.principal = balance.principal.saturating_sub(amount);
        Ok(())
    }

    /// Pay a principal share and a yield slice to one account in a single
    /// transfer, so a maturity withdrawal cannot half-land.
    pub fn withdraw_with_yield(
        &mut self,
        cap: &Capability,
        to: &MemberAddress,
        principal: Amount,
        yield_slice: Amount,
        vault: &dyn ValueTransfer,
        adapter: &dyn YieldAdapter,
    ) -> Result<Amount, EscrowError> {
        let group = self.verify(cap)?;
        let total = principal
            .checked_add(yield_slice)
            .ok_or(EscrowError::Overflow)?;
        if total.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self
            .balances
            .get(&group)
            .ok_or(EscrowError::BalanceNotFound(group))?;
        if balance.principal < principal {
            return Err(EscrowError::InsufficientPrincipal {
                needed: principal.raw(),
                available: balance.principal.raw(),
            });
        }
        if balance.yield_reserve < yield_slice {
            return Err(EscrowError::InsufficientYield {
                needed: yield_slice.raw(),
                available: balance.yield_reserve.raw(),
            });
        }
        self.ensure_cash(total, adapter)?;
        vault.transfer(to, total)?;
        let balance = self.balance_mut(group)?;
        balance.principal = balance.principal.saturating_sub(principal);
        balance.yield_reserve = balance.yield_reserve.saturating_sub(yield_slice);
        self.on_hand = self.on_hand.saturating_sub(total);
        Ok(total)
    }

    /// Pay principal straight out to an account (cancellation refunds,
    /// matured principal). Pulls any cash shortfall back first.
    pub fn withdraw(
        &mut self,
        cap: &Capability,
        to: &MemberAddress,
        amount: Amount,
        vault: &dyn ValueTransfer,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self
            .balances
            .get(&group)
            .ok_or(EscrowError::BalanceNotFound(group))?;
        if balance.principal < amount {
            return Err(EscrowError::InsufficientPrincipal {
                needed: amount.raw(),
                available: balance.principal.raw(),
            });
        }
        self.ensure_cash(amount, adapter)?;
        vault.transfer(to, amount)?;
        let balance = self.balance_mut(group)?;
        balance.principal = balance.principal.saturating_sub(amount);
        self.on_hand = self.on_hand.saturating_sub(amount);
        Ok(())
    }

    /// Commit a cycle payout: `gross` leaves principal, `net` becomes a
    /// pending payout and the difference accrues as platform fee.
    pub fn commit_payout(
        &mut self,
        cap: &Capability,
        gross: Amount,
        net: Amount,
    ) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if gross.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        if net > gross {
            return Err(EscrowError::NetExceedsGross {
                net: net.raw(),
                gross: gross.raw(),
            });
        }
        let fee = gross - net;
        let balance = self.balance_mut(group)?;
        if balance.principal < gross {
            return Err(EscrowError::InsufficientPrincipal {
                needed: gross.raw(),
                available: balance.principal.raw(),
            });
        }
        balance.principal = balance.principal.saturating_sub(gross);
        balance.pending_payouts = balance
            .pending_payouts
            .checked_add(net)
            .ok_or(EscrowError::Overflow)?;
        self.platform_fees = self
            .platform_fees
            .checked_add(fee)
            .ok_or(EscrowError::Overflow)?;
        Ok(())
    }

    /// Settle a committed payout to its recipient.
    pub fn release_pending(
        &mut self,
        cap: &Capability,
        to: &MemberAddress,
        amount: Amount,
        vault: &dyn ValueTransfer,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self
            .balances
            .get(&group)
            .ok_or(EscrowError::BalanceNotFound(group))?;
        if balance.pending_payouts < amount {
            return Err(EscrowError::InsufficientPending {
                needed: amount.raw(),
                available: balance.pending_payouts.raw(),
            });
        }
        self.ensure_cash(amount, adapter)?;
        vault.transfer(to, amount)?;
        let balance = self.balance_mut(group)?;
        balance.pending_payouts = balance.pending_payouts.saturating_sub(amount);
        self.on_hand = self.on_hand.saturating_sub(amount);
        Ok(())
    }

    /// Pay out of the group's yield reserve (maturity slices).
    pub fn withdraw_yield(
        &mut self,
        cap: &Capability,
        to: &MemberAddress,
        amount: Amount,
        vault: &dyn ValueTransfer,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        let group = self.verify(cap)?;
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        let balance = self
            .balances
            .get(&group)
            .ok_or(EscrowError::BalanceNotFound(group))?;
        if balance.yield_reserve < amount {
            return Err(EscrowError::InsufficientYield {
                needed: amount.raw(),
                available: balance.yield_reserve.raw(),
            });
        }
        self.ensure_cash(amount, adapter)?;
        vault.transfer(to, amount)?;
        let balance = self.balance_mut(group)?;
        balance.yield_reserve = balance.yield_reserve.saturating_sub(amount);
        self.on_hand = self.on_hand.saturating_sub(amount);
        Ok(())
    }

    /// Realise yield from the adapter and split it between the group's
    /// reserve and the insurance pool. Harvesting twice at the same instant
    /// returns a zero split the second time; the adapter owns accrual.
    pub fn harvest_yield(
        &mut self,
        cap: &Capability,
        adapter: &dyn YieldAdapter,
    ) -> Result<HarvestSplit, EscrowError> {
        let group = self.verify(cap)?;
        let harvested = adapter.harvest()?;
        if harvested.is_zero() {
            return Ok(HarvestSplit {
                group_share: Amount::ZERO,
                insurance_share: Amount::ZERO,
            });
        }
        let group_share = harvested.bps(self.params.yield_group_share_bps);
        let insurance_share = harvested - group_share;
        let new_on_hand = self
            .on_hand
            .checked_add(group_share)
            .ok_or(EscrowError::Overflow)?;
        let balance = self.balance_mut(group)?;
        balance.yield_reserve = balance
            .yield_reserve
            .checked_add(group_share)
            .ok_or(EscrowError::Overflow)?;
        self.on_hand = new_on_hand;
        Ok(HarvestSplit {
            group_share,
            insurance_share,
        })
    }

    /// Pay collected platform fees out; admin only.
    pub fn withdraw_fees(
        &mut self,
        caller: &MemberAddress,
        to: &MemberAddress,
        amount: Amount,
        vault: &dyn ValueTransfer,
        adapter: &dyn YieldAdapter,
    ) -> Result<(), EscrowError> {
        if caller != &self.admin {
            return Err(EscrowError::NotAdmin);
        }
        if amount.is_zero() {
            return Err(EscrowError::ZeroAmount);
        }
        if self.platform_fees < amount {
            return Err(EscrowError::InsufficientFees {
                needed: amount.raw(),
                available: self.platform_fees.raw(),
            });
        }
        self.ensure_cash(amount, adapter)?;
        vault.transfer(to, amount)?;
        self.platform_fees = self.platform_fees.saturating_sub(amount);
        self.on_hand = self.on_hand.saturating_sub(amount);
        Ok(())
    }

    pub fn balance(&self, group: GroupId) -> Option<&EscrowBalance> {
        self.balances.get(&group)
    }

    pub fn on_hand(&self) -> Amount {
        self.on_hand
    }

    pub fn deployed(&self) -> Amount {
        self.deployed
    }

    pub fn platform_fees(&self) -> Amount {
        self.platform_fees
    }

    /// Sum of every bucket the ledger accounts for. Conservation means this
    /// never exceeds `on_hand + deployed` (harvested-but-unswept insurance
    /// shares may make the asset side strictly larger).
    pub fn accounted(&self) -> Amount {
        self.balances
            .values()
            .map(|b| b.principal + b.yield_reserve + b.pending_payouts)
            .sum::<Amount>()
            + self.platform_fees
    }
}

impl EscrowLedger {
    /// Persist all ledger state to an escrow store.
    pub fn save_to_store(&self, store: &dyn susu_store::EscrowStore) -> Result<(), EscrowError> {
        let meta = (
            self.next_token,
            self.grants.clone(),
            self.on_hand,
            self.deployed,
            self.platform_fees,
        );
        let bytes = bincode::serialize(&meta).map_err(|e| EscrowError::Store(e.to_string()))?;
        store
            .put_meta(b"escrow_ledger", &bytes)
            .map_err(|e| EscrowError::Store(e.to_string()))?;

        for (group, balance) in &self.balances {
            let bytes =
                bincode::serialize(balance).map_err(|e| EscrowError::Store(e.to_string()))?;
            store
                .put_balance(*group, &bytes)
                .map_err(|e| EscrowError::Store(e.to_string()))?;
        }
        Ok(())
    }

    /// Restore ledger state from an escrow store.
    pub fn load_from_store(
        params: ProtocolParams,
        admin: MemberAddress,
        store: &dyn susu_store::EscrowStore,
    ) -> Result<Self, EscrowError> {
        let mut ledger = Self::new(params, admin);

        if let Some(bytes) = store
            .get_meta(b"escrow_ledger")
            .map_err(|e| EscrowError::Store(e.to_string()))?
        {
            type Meta = (u64, HashMap<GroupId, u64>, Amount, Amount, Amount);
            let (next_token, grants, on_hand, deployed, platform_fees): Meta =
                bincode::deserialize(&bytes).map_err(|e| EscrowError::Store(e.to_string()))?;
            ledger.next_token = next_token;
            ledger.grants = grants;
            ledger.on_hand = on_hand;
            ledger.deployed = deployed;
            ledger.platform_fees = platform_fees;
        }

        for (group, bytes) in store
            .iter_balances()
            .map_err(|e| EscrowError::Store(e.to_string()))?
        {
            let balance: EscrowBalance =
                bincode::deserialize(&bytes).map_err(|e| EscrowError::Store(e.to_string()))?;
            ledger.balances.insert(group, balance);
        }
        Ok(ledger)
    }
}
