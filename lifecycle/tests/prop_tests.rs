//! Property tests: money conservation across arbitrary rotational runs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use susu_lifecycle::{GroupCoordinator, GroupStatus};
use susu_types::{
    AdapterError, Amount, Bps, GroupConfig, GroupModel, MemberAddress, ProtocolParams, Timestamp,
    TransferError, ValueTransfer, YieldAdapter,
};

fn addr(name: &str) -> MemberAddress {
    MemberAddress::from(name)
}

#[derive(Default)]
struct CountingVault {
    pulled: Cell<u128>,
    paid: Cell<u128>,
}

impl ValueTransfer for CountingVault {
    fn transfer(&self, _to: &MemberAddress, amount: Amount) -> Result<(), TransferError> {
        self.paid.set(self.paid.get() + amount.raw());
        Ok(())
    }

    fn transfer_from(
        &self,
        _from: &MemberAddress,
        _to: &MemberAddress,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.pulled.set(self.pulled.get() + amount.raw());
        Ok(())
    }
}

#[derive(Default)]
struct SinkAdapter {
    held: RefCell<u128>,
}

impl YieldAdapter for SinkAdapter {
    fn deposit(&self, amount: Amount) -> Result<(), AdapterError> {
        *self.held.borrow_mut() += amount.raw();
        Ok(())
    }

    fn withdraw(&self, amount: Amount) -> Result<(), AdapterError> {
        let mut held = self.held.borrow_mut();
        if *held < amount.raw() {
            return Err(AdapterError::WithdrawFailed(amount, "underfunded".into()));
        }
        *held -= amount.raw();
        Ok(())
    }

    fn harvest(&self) -> Result<Amount, AdapterError> {
        Ok(Amount::ZERO)
    }

    fn balance(&self) -> Amount {
        Amount::new(*self.held.borrow())
    }

    fn apy_bps(&self) -> u32 {
        0
    }
}

fn config() -> GroupConfig {
    GroupConfig {
        model: GroupModel::Rotational,
        contribution_amount: Amount::new(100),
        cycle_interval_secs: 7 * 24 * 3600,
        group_size: 3,
        lock_duration_secs: 0,
        grace_period_secs: 24 * 3600,
        stake_required: Amount::new(50),
        insurance_enabled: true,
        insurance_bps: Bps::from_const(1000),
        platform_fee_bps: Bps::from_const(100),
        early_withdrawal_penalty_bps: Bps::from_const(500),
    }
}

const MEMBERS: [&str; 3] = ["alice", "bob", "carol"];

proptest! {
    /// Whatever mix of payments and defaults a rotation sees, every unit
    /// pulled from members is either paid back out or still accounted for
    /// in one of the ledgers.
    #[test]
    fn rotation_conserves_money(pays in proptest::collection::vec(any::<bool>(), 9)) {
        let vault = Rc::new(CountingVault::default());
        let adapter = Rc::new(SinkAdapter::default());
        let coordinator = GroupCoordinator::new(
            ProtocolParams::susu_defaults(),
            addr("admin"),
            addr("treasury"),
            [addr("proc1"), addr("proc2")],
            vault.clone() as Rc<dyn ValueTransfer>,
            adapter as Rc<dyn YieldAdapter>,
        );
        let t0 = Timestamp::new(1_000_000);
        let id = coordinator.create_group(&addr("alice"), config(), t0).unwrap();
        for name in MEMBERS {
            coordinator.join(id, &addr(name), t0).unwrap();
        }
        let window = config().contribution_window_secs();

        for cycle in 1u32..=3 {
            let start = coordinator.group(id).unwrap().cycle_start;
            let payers: Vec<&str> = MEMBERS
                .iter()
                .enumerate()
                .filter(|(i, _)| pays[(cycle as usize - 1) * 3 + i])
                .map(|(_, n)| *n)
                .collect();
            for name in &payers {
                coordinator.contribute(id, &addr(name), start.plus(10)).unwrap();
            }
            let after = start.plus(window + 1);
            for name in MEMBERS.iter().filter(|n| !payers.contains(n)) {
                coordinator.enforce_missed_payment(id, &addr(name), after).unwrap();
            }

            let group = coordinator.group(id).unwrap();
            let payout = group.payouts.get(&cycle).unwrap();
            if !payout.executed {
                coordinator.settle_payout(id, cycle).unwrap();
            }
        }

        let group = coordinator.group(id).unwrap();
        prop_assert_eq!(group.status, GroupStatus::Completed);

        for name in MEMBERS {
            if !coordinator.stake_amount(id, &addr(name)).is_zero() {
                coordinator.reclaim_stake(id, &addr(name)).unwrap();
            }
            prop_assert!(coordinator.trust_score(&addr(name)) <= 1000);
        }

        let balance = coordinator.escrow_balance(id).unwrap();
        let pool = coordinator.premium_pool(id).unwrap();
        let retained = coordinator.platform_fees().raw()
            + balance.principal.raw()
            + balance.yield_reserve.raw()
            + pool.reserve.raw()
            + pool.balance.raw();
        prop_assert_eq!(vault.pulled.get() - vault.paid.get(), retained);
    }
}
