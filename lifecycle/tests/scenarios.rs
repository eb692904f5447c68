//! End-to-end lifecycle scenarios across all three ledgers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use susu_insurance::ClaimStatus;
use susu_lifecycle::{ContributionStatus, GroupCoordinator, GroupStatus, LifecycleError};
use susu_types::{
    AdapterError, Amount, Bps, GroupConfig, GroupModel, MemberAddress, ProtocolParams, Timestamp,
    TransferError, ValueTransfer, YieldAdapter,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn addr(name: &str) -> MemberAddress {
    MemberAddress::from(name)
}

#[derive(Default)]
struct TestVault {
    pulled: RefCell<Vec<(MemberAddress, Amount)>>,
    paid: RefCell<Vec<(MemberAddress, Amount)>>,
}

impl TestVault {
    fn total_pulled(&self) -> u128 {
        self.pulled.borrow().iter().map(|(_, a)| a.raw()).sum()
    }

    fn total_paid(&self) -> u128 {
        self.paid.borrow().iter().map(|(_, a)| a.raw()).sum()
    }

    fn paid_to(&self, who: &MemberAddress) -> u128 {
        self.paid
            .borrow()
            .iter()
            .filter(|(to, _)| to == who)
            .map(|(_, a)| a.raw())
            .sum()
    }
}

impl ValueTransfer for TestVault {
    fn transfer(&self, to: &MemberAddress, amount: Amount) -> Result<(), TransferError> {
        self.paid.borrow_mut().push((to.clone(), amount));
        Ok(())
    }

    fn transfer_from(
        &self,
        from: &MemberAddress,
        _to: &MemberAddress,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.pulled.borrow_mut().push((from.clone(), amount));
        Ok(())
    }
}

struct TestAdapter {
    held: Cell<u128>,
    pending_yield: Cell<u128>,
}

impl TestAdapter {
    fn new() -> Self {
        Self {
            held: Cell::new(0),
            pending_yield: Cell::new(0),
        }
    }

    fn set_yield(&self, amount: u128) {
        self.pending_yield.set(amount);
    }
}

impl YieldAdapter for TestAdapter {
    fn deposit(&self, amount: Amount) -> Result<(), AdapterError> {
        self.held.set(self.held.get() + amount.raw());
        Ok(())
    }

    fn withdraw(&self, amount: Amount) -> Result<(), AdapterError> {
        if self.held.get() < amount.raw() {
            return Err(AdapterError::WithdrawFailed(amount, "underfunded".into()));
        }
        self.held.set(self.held.get() - amount.raw());
        Ok(())
    }

    fn harvest(&self) -> Result<Amount, AdapterError> {
        Ok(Amount::new(self.pending_yield.take()))
    }

    fn balance(&self) -> Amount {
        Amount::new(self.held.get())
    }

    fn apy_bps(&self) -> u32 {
        500
    }
}

fn make_coordinator() -> (GroupCoordinator, Rc<TestVault>, Rc<TestAdapter>) {
    init_tracing();
    let vault = Rc::new(TestVault::default());
    let adapter = Rc::new(TestAdapter::new());
    let coordinator = GroupCoordinator::new(
        ProtocolParams::susu_defaults(),
        addr("admin"),
        addr("treasury"),
        [addr("proc1"), addr("proc2"), addr("proc3")],
        vault.clone() as Rc<dyn ValueTransfer>,
        adapter.clone() as Rc<dyn YieldAdapter>,
    );
    (coordinator, vault, adapter)
}

fn rotational_config() -> GroupConfig {
    GroupConfig {
        model: GroupModel::Rotational,
        contribution_amount: Amount::new(100),
        cycle_interval_secs: 7 * 24 * 3600,
        group_size: 3,
        lock_duration_secs: 0,
        grace_period_secs: 24 * 3600,
        stake_required: Amount::new(50),
        insurance_enabled: false,
        insurance_bps: Bps::ZERO,
        platform_fee_bps: Bps::from_const(100),
        early_withdrawal_penalty_bps: Bps::from_const(500),
    }
}

fn fixed_config() -> GroupConfig {
    GroupConfig {
        model: GroupModel::FixedSavings,
        contribution_amount: Amount::new(500),
        cycle_interval_secs: 30 * 24 * 3600,
        group_size: 3,
        lock_duration_secs: 90 * 24 * 3600,
        grace_period_secs: 24 * 3600,
        stake_required: Amount::new(50),
        insurance_enabled: false,
        insurance_bps: Bps::ZERO,
        platform_fee_bps: Bps::from_const(100),
        early_withdrawal_penalty_bps: Bps::from_const(500),
    }
}

const MEMBERS: [&str; 3] = ["alice", "bob", "carol"];

fn join_all(coordinator: &GroupCoordinator, group: u64, t: Timestamp) {
    for name in MEMBERS {
        coordinator.join(group, &addr(name), t).unwrap();
    }
}

#[test]
fn rotational_group_runs_a_full_rotation() {
    let (coordinator, vault, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), rotational_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);

    let mut now = t0;
    for cycle in 1u32..=3 {
        for name in MEMBERS {
            coordinator.contribute(id, &addr(name), now.plus(10)).unwrap();
        }
        let group = coordinator.group(id).unwrap();
        let payout = group.payouts.get(&cycle).unwrap();
        // 300 pot at a 1% fee: 297, rotating through the join order.
        assert_eq!(payout.amount, Amount::new(297));
        assert_eq!(payout.recipient, addr(MEMBERS[(cycle - 1) as usize]));
        coordinator.settle_payout(id, cycle).unwrap();
        // Cycle start was reset by resolution; keep paying inside windows.
        now = coordinator.group(id).unwrap().cycle_start;
    }

    let group = coordinator.group(id).unwrap();
    assert_eq!(group.status, GroupStatus::Completed);

    // Everyone received one pot and gets their stake back.
    for name in MEMBERS {
        assert_eq!(vault.paid_to(&addr(name)), 297);
        assert_eq!(
            coordinator.reclaim_stake(id, &addr(name)).unwrap(),
            Amount::new(50)
        );
    }

    // Conservation: what stayed behind is exactly the platform fee.
    assert_eq!(coordinator.platform_fees(), Amount::new(9));
    assert_eq!(vault.total_pulled() - vault.total_paid(), 9);
}

#[test]
fn fixed_savings_pays_principal_plus_yield_slice_at_maturity() {
    let (coordinator, _, adapter) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), fixed_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);

    for name in MEMBERS {
        coordinator.contribute(id, &addr(name), t0.plus(10)).unwrap();
    }

    // 150 of yield accrues: 80% to the group reserve, 20% to insurance.
    adapter.set_yield(150);
    let split = coordinator.harvest_yield(id).unwrap();
    assert_eq!(split.group_share, Amount::new(120));
    assert_eq!(split.insurance_share, Amount::new(30));
    let pool = coordinator.premium_pool(id).unwrap();
    assert_eq!(pool.reserve + pool.balance, Amount::new(30));

    // Just before maturity nothing moves.
    let maturity = t0.plus(90 * 24 * 3600);
    let early =
        coordinator.withdraw_matured(id, &addr("bob"), Timestamp::new(maturity.as_secs() - 1));
    assert!(matches!(early, Err(LifecycleError::NotMatured(_))));

    // Each member saved 500 of 1500: 500 principal + 120 * 500/1500 = 540.
    for name in MEMBERS {
        assert_eq!(
            coordinator.withdraw_matured(id, &addr(name), maturity).unwrap(),
            Amount::new(540)
        );
    }

    let group = coordinator.group(id).unwrap();
    assert_eq!(group.status, GroupStatus::Completed);
    let balance = coordinator.escrow_balance(id).unwrap();
    assert_eq!(balance.principal, Amount::ZERO);
    assert_eq!(balance.yield_reserve, Amount::ZERO);

    let repeat = coordinator.withdraw_matured(id, &addr("alice"), maturity.plus(1));
    assert!(matches!(repeat, Err(LifecycleError::InvalidStatus { .. })));
}

#[test]
fn maturity_split_matches_the_contribution_shares() {
    let (coordinator, _, adapter) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), fixed_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);

    // Carol leaves before saving anything; alice and bob carry the group.
    assert_eq!(
        coordinator.early_withdraw(id, &addr("carol"), t0.plus(10)).unwrap(),
        Amount::ZERO
    );
    coordinator.contribute(id, &addr("alice"), t0.plus(20)).unwrap();
    coordinator.contribute(id, &addr("bob"), t0.plus(20)).unwrap();

    adapter.set_yield(50);
    let split = coordinator.harvest_yield(id).unwrap();
    assert_eq!(split.group_share, Amount::new(40));

    // 500 of 1000 saved, 40 in the reserve: 500 + 40 * 500/1000 = 520.
    let maturity = t0.plus(90 * 24 * 3600);
    assert_eq!(
        coordinator.withdraw_matured(id, &addr("alice"), maturity).unwrap(),
        Amount::new(520)
    );
    assert_eq!(
        coordinator.withdraw_matured(id, &addr("bob"), maturity).unwrap(),
        Amount::new(520)
    );
    assert_eq!(coordinator.group(id).unwrap().status, GroupStatus::Completed);
}

#[test]
fn early_withdrawal_pays_penalty_into_the_insurance_pool() {
    let (coordinator, vault, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), fixed_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);
    for name in MEMBERS {
        coordinator.contribute(id, &addr(name), t0.plus(10)).unwrap();
    }

    // 5% penalty on 500 saved: 25 to insurance, 475 out.
    let paid = coordinator
        .early_withdraw(id, &addr("alice"), t0.plus(24 * 3600))
        .unwrap();
    assert_eq!(paid, Amount::new(475));
    assert_eq!(vault.paid_to(&addr("alice")), 475);
    let pool = coordinator.premium_pool(id).unwrap();
    assert_eq!(pool.total_premiums, Amount::new(25));

    let group = coordinator.group(id).unwrap();
    let m = group.member(&addr("alice")).unwrap();
    assert!(m.has_withdrawn);
    assert!(!m.is_active);

    let again = coordinator.early_withdraw(id, &addr("alice"), t0.plus(48 * 3600));
    assert!(matches!(again, Err(LifecycleError::AlreadyWithdrawn(_))));

    // The exit does not block the others from maturing normally.
    let maturity = t0.plus(90 * 24 * 3600);
    for name in ["bob", "carol"] {
        assert_eq!(
            coordinator.withdraw_matured(id, &addr(name), maturity).unwrap(),
            Amount::new(500)
        );
    }
    assert_eq!(coordinator.group(id).unwrap().status, GroupStatus::Completed);
}

#[test]
fn missed_payment_is_slashed_and_recorded_as_default() {
    let (coordinator, _, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), rotational_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);

    coordinator.contribute(id, &addr("alice"), t0.plus(10)).unwrap();
    coordinator.contribute(id, &addr("bob"), t0.plus(10)).unwrap();

    let after_window = t0.plus(rotational_config().contribution_window_secs() + 1);
    coordinator
        .enforce_missed_payment(id, &addr("carol"), after_window)
        .unwrap();

    // Stake 50 at a 20% penalty, missed 100: slashed min(10, 100, 50) = 10.
    assert_eq!(coordinator.stake_amount(id, &addr("carol")), Amount::new(40));
    assert_eq!(coordinator.trust_score(&addr("carol")), 50);
    let group = coordinator.group(id).unwrap();
    let entry = group
        .contributions
        .get(&(1, addr("carol")))
        .unwrap();
    assert_eq!(entry.status, ContributionStatus::Defaulted);
    assert_eq!(entry.amount, Amount::new(10));

    // The slashed 10 joined the pot: 210 gross, 1% fee, 208 out.
    let payout = group.payouts.get(&1).unwrap();
    assert_eq!(payout.amount, Amount::new(208));
    assert_eq!(payout.recipient, addr("alice"));

    // Enforcement is idempotent per cycle.
    let repeat = coordinator.enforce_missed_payment(id, &addr("carol"), after_window.plus(10));
    assert!(matches!(repeat, Err(LifecycleError::AlreadySettled { .. })));
}

#[test]
fn insurance_covers_part_of_a_missed_payment() {
    let (coordinator, _, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let mut config = rotational_config();
    config.insurance_enabled = true;
    config.insurance_bps = Bps::from_const(1000);
    let id = coordinator.create_group(&addr("alice"), config, t0).unwrap();
    join_all(&coordinator, id, t0);

    // 10% premium: two contributions fund the pool with 20 (18 claimable).
    coordinator.contribute(id, &addr("alice"), t0.plus(10)).unwrap();
    coordinator.contribute(id, &addr("bob"), t0.plus(10)).unwrap();

    let after_window = t0.plus(rotational_config().contribution_window_secs() + 1);
    coordinator
        .enforce_missed_payment(id, &addr("carol"), after_window)
        .unwrap();

    let group = coordinator.group(id).unwrap();
    let entry = group.contributions.get(&(1, addr("carol"))).unwrap();
    assert_eq!(entry.status, ContributionStatus::CoveredByInsurance);
    // Slashed 10 plus the whole claimable pool of 18.
    assert_eq!(entry.amount, Amount::new(28));
    let pool = coordinator.premium_pool(id).unwrap();
    assert_eq!(pool.balance, Amount::ZERO);
    assert_eq!(pool.total_shortfall_covered, Amount::new(18));
    // The reserve cushion is never drawn by coverage.
    assert_eq!(pool.reserve, Amount::new(2));

    // Pot: 90 + 90 + 28 = 208 gross, 2 fee.
    assert_eq!(group.payouts.get(&1).unwrap().amount, Amount::new(206));
    // The covered 18 funds the pot, never the defaulter's own share.
    assert_eq!(
        group.member(&addr("carol")).unwrap().net_contributed,
        Amount::new(10)
    );
}

#[test]
fn zero_stake_defaults_still_build_history() {
    let (coordinator, _, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let mut config = rotational_config();
    config.stake_required = Amount::ZERO;
    let id = coordinator.create_group(&addr("alice"), config, t0).unwrap();
    join_all(&coordinator, id, t0);
    let window = rotational_config().contribution_window_secs();

    // Nothing to slash, but every default still lands on the record.
    let mut cycle_start = t0;
    for cycle in 1u32..=3 {
        coordinator
            .contribute(id, &addr("alice"), cycle_start.plus(10))
            .unwrap();
        coordinator
            .contribute(id, &addr("bob"), cycle_start.plus(10))
            .unwrap();
        coordinator
            .enforce_missed_payment(id, &addr("carol"), cycle_start.plus(window + 1))
            .unwrap();
        let group = coordinator.group(id).unwrap();
        let entry = group.contributions.get(&(cycle, addr("carol"))).unwrap();
        assert_eq!(entry.status, ContributionStatus::Defaulted);
        assert_eq!(entry.amount, Amount::ZERO);
        cycle_start = group.cycle_start;
    }

    assert_eq!(coordinator.trust_score(&addr("carol")), 0);
    assert!(coordinator.is_blacklisted(&addr("carol")));

    // The blacklist bites even where no stake deposit would check it.
    let mut config = rotational_config();
    config.stake_required = Amount::ZERO;
    let other = coordinator
        .create_group(&addr("dave"), config, cycle_start)
        .unwrap();
    let result = coordinator.join(other, &addr("carol"), cycle_start);
    assert!(matches!(result, Err(LifecycleError::Stake(_))));
}

#[test]
fn savings_default_never_draws_the_insurance_pool() {
    let (coordinator, _, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let mut config = fixed_config();
    config.insurance_enabled = true;
    config.insurance_bps = Bps::from_const(1000);
    let id = coordinator.create_group(&addr("alice"), config, t0).unwrap();
    join_all(&coordinator, id, t0);

    // 10% premiums: pool holds 100 (90 claimable) after two contributions.
    coordinator.contribute(id, &addr("alice"), t0.plus(10)).unwrap();
    coordinator.contribute(id, &addr("bob"), t0.plus(10)).unwrap();

    let after_window = t0.plus(fixed_config().contribution_window_secs() + 1);
    coordinator
        .enforce_missed_payment(id, &addr("carol"), after_window)
        .unwrap();

    // Only carol's slashed collateral stands in; the pool stays whole.
    let group = coordinator.group(id).unwrap();
    let entry = group.contributions.get(&(1, addr("carol"))).unwrap();
    assert_eq!(entry.status, ContributionStatus::Defaulted);
    assert_eq!(entry.amount, Amount::new(10));
    let pool = coordinator.premium_pool(id).unwrap();
    assert_eq!(pool.balance, Amount::new(90));
    assert_eq!(pool.total_shortfall_covered, Amount::ZERO);

    // At maturity the defaulter takes out their own 10, nothing more.
    let maturity = t0.plus(90 * 24 * 3600);
    assert_eq!(
        coordinator.withdraw_matured(id, &addr("carol"), maturity).unwrap(),
        Amount::new(10)
    );
    assert_eq!(
        coordinator.withdraw_matured(id, &addr("alice"), maturity).unwrap(),
        Amount::new(450)
    );
    assert_eq!(
        coordinator.withdraw_matured(id, &addr("bob"), maturity).unwrap(),
        Amount::new(450)
    );
    assert_eq!(coordinator.premium_pool(id).unwrap().balance, Amount::new(90));
}

#[test]
fn three_defaults_blacklist_platform_wide_until_whitelisted() {
    let (coordinator, _, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), rotational_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);
    let window = rotational_config().contribution_window_secs();

    let mut cycle_start = t0;
    for _ in 0..3 {
        coordinator
            .contribute(id, &addr("alice"), cycle_start.plus(10))
            .unwrap();
        coordinator
            .contribute(id, &addr("bob"), cycle_start.plus(10))
            .unwrap();
        let after = cycle_start.plus(window + 1);
        coordinator
            .enforce_missed_payment(id, &addr("carol"), after)
            .unwrap();
        cycle_start = coordinator.group(id).unwrap().cycle_start;
    }

    assert!(coordinator.is_blacklisted(&addr("carol")));
    assert_eq!(coordinator.trust_score(&addr("carol")), 0);
    assert_eq!(coordinator.group(id).unwrap().status, GroupStatus::Completed);

    // Blocked from any new group, platform-wide.
    let other = coordinator
        .create_group(&addr("dave"), rotational_config(), cycle_start)
        .unwrap();
    let result = coordinator.join(other, &addr("carol"), cycle_start);
    assert!(matches!(result, Err(LifecycleError::Stake(_))));

    // An admin whitelist clears the flag; trust history stays at the floor.
    coordinator.whitelist(&addr("admin"), &addr("carol")).unwrap();
    coordinator.join(other, &addr("carol"), cycle_start).unwrap();
    assert_eq!(coordinator.trust_score(&addr("carol")), 0);
}

#[test]
fn claim_workflow_submit_approve_execute() {
    let (coordinator, vault, _) = make_coordinator();
    let t0 = Timestamp::new(1_000_000);
    let mut config = rotational_config();
    config.model = GroupModel::EmergencyLiquidity;
    config.contribution_amount = Amount::new(1000);
    config.insurance_enabled = true;
    config.insurance_bps = Bps::from_const(2000);
    let id = coordinator.create_group(&addr("alice"), config, t0).unwrap();
    join_all(&coordinator, id, t0);

    // 20% of each 1000 contribution: pool gets 600 (540 claimable).
    for name in MEMBERS {
        coordinator.contribute(id, &addr(name), t0.plus(10)).unwrap();
    }
    let pool = coordinator.premium_pool(id).unwrap();
    assert_eq!(pool.balance, Amount::new(540));
    assert_eq!(pool.reserve, Amount::new(60));

    let result = coordinator.submit_claim(
        id,
        &addr("stranger"),
        Amount::new(150),
        "evidence://doc",
        t0.plus(20),
    );
    assert!(matches!(result, Err(LifecycleError::NotAMember { .. })));

    let claim = coordinator
        .submit_claim(id, &addr("alice"), Amount::new(150), "evidence://doc", t0.plus(20))
        .unwrap();

    let result = coordinator.approve_claim(&addr("alice"), claim, None, t0.plus(30));
    assert!(matches!(result, Err(LifecycleError::Insurance(_))));

    let status = coordinator
        .approve_claim(&addr("proc1"), claim, None, t0.plus(30))
        .unwrap();
    assert_eq!(status, ClaimStatus::Submitted);
    let status = coordinator
        .approve_claim(&addr("proc2"), claim, None, t0.plus(40))
        .unwrap();
    assert_eq!(status, ClaimStatus::Approved);

    let paid = coordinator.execute_claim_payout(claim, t0.plus(50)).unwrap();
    assert_eq!(paid, Amount::new(150));
    assert_eq!(vault.paid_to(&addr("alice")), 150);
    assert_eq!(coordinator.claim(claim).unwrap().status, ClaimStatus::Paid);
    assert_eq!(
        coordinator.premium_pool(id).unwrap().balance,
        Amount::new(390)
    );

    // Back-to-back claims by the same member hit the cooldown.
    let result = coordinator.submit_claim(
        id,
        &addr("alice"),
        Amount::new(100),
        "evidence://doc2",
        t0.plus(60),
    );
    assert!(matches!(result, Err(LifecycleError::Insurance(_))));
}

/// A yield adapter that calls back into the coordinator during a deposit,
/// the way a malicious strategy contract would.
struct ReentrantAdapter {
    target: RefCell<Option<GroupCoordinator>>,
    observed: RefCell<Vec<Result<(), String>>>,
}

impl ReentrantAdapter {
    fn new() -> Self {
        Self {
            target: RefCell::new(None),
            observed: RefCell::new(Vec::new()),
        }
    }

    fn arm(&self, coordinator: GroupCoordinator) {
        *self.target.borrow_mut() = Some(coordinator);
    }
}

impl YieldAdapter for ReentrantAdapter {
    fn deposit(&self, _amount: Amount) -> Result<(), AdapterError> {
        let target = self.target.borrow();
        if let Some(coordinator) = target.as_ref() {
            let result = coordinator
                .contribute(1, &addr("bob"), Timestamp::new(1_000_010))
                .map_err(|e| e.to_string());
            self.observed.borrow_mut().push(result);
        }
        Ok(())
    }

    fn withdraw(&self, _amount: Amount) -> Result<(), AdapterError> {
        Ok(())
    }

    fn harvest(&self) -> Result<Amount, AdapterError> {
        Ok(Amount::ZERO)
    }

    fn balance(&self) -> Amount {
        Amount::ZERO
    }

    fn apy_bps(&self) -> u32 {
        0
    }
}

/// An adapter that tries an admin operation on the same group mid-deposit.
struct AdminCallingAdapter {
    target: RefCell<Option<GroupCoordinator>>,
    observed: RefCell<Vec<String>>,
}

impl AdminCallingAdapter {
    fn new() -> Self {
        Self {
            target: RefCell::new(None),
            observed: RefCell::new(Vec::new()),
        }
    }
}

impl YieldAdapter for AdminCallingAdapter {
    fn deposit(&self, _amount: Amount) -> Result<(), AdapterError> {
        let target = self.target.borrow();
        if let Some(coordinator) = target.as_ref() {
            let err = coordinator
                .set_emergency_mode(&addr("admin"), 1, true)
                .unwrap_err();
            self.observed.borrow_mut().push(err.to_string());
        }
        Ok(())
    }

    fn withdraw(&self, _amount: Amount) -> Result<(), AdapterError> {
        Ok(())
    }

    fn harvest(&self) -> Result<Amount, AdapterError> {
        Ok(Amount::ZERO)
    }

    fn balance(&self) -> Amount {
        Amount::ZERO
    }

    fn apy_bps(&self) -> u32 {
        0
    }
}

#[test]
fn admin_operations_hold_the_group_guard() {
    init_tracing();
    let vault = Rc::new(TestVault::default());
    let adapter = Rc::new(AdminCallingAdapter::new());
    let coordinator = GroupCoordinator::new(
        ProtocolParams::susu_defaults(),
        addr("admin"),
        addr("treasury"),
        [addr("proc1"), addr("proc2")],
        vault.clone() as Rc<dyn ValueTransfer>,
        adapter.clone() as Rc<dyn YieldAdapter>,
    );
    *adapter.target.borrow_mut() = Some(coordinator.clone());

    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), rotational_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);
    coordinator.contribute(id, &addr("alice"), t0.plus(10)).unwrap();

    {
        let observed = adapter.observed.borrow();
        assert!(!observed.is_empty());
        for message in observed.iter() {
            assert!(message.contains("in flight"), "unexpected error: {message}");
        }
    }

    // The same call goes through once nothing is in flight.
    coordinator.set_emergency_mode(&addr("admin"), id, true).unwrap();
}

#[test]
fn reentrant_adapter_callback_is_rejected_cleanly() {
    init_tracing();
    let vault = Rc::new(TestVault::default());
    let adapter = Rc::new(ReentrantAdapter::new());
    let coordinator = GroupCoordinator::new(
        ProtocolParams::susu_defaults(),
        addr("admin"),
        addr("treasury"),
        [addr("proc1"), addr("proc2")],
        vault.clone() as Rc<dyn ValueTransfer>,
        adapter.clone() as Rc<dyn YieldAdapter>,
    );
    adapter.arm(coordinator.clone());

    let t0 = Timestamp::new(1_000_000);
    let id = coordinator
        .create_group(&addr("alice"), rotational_config(), t0)
        .unwrap();
    join_all(&coordinator, id, t0);

    // The outer contribution sweeps idle funds, the adapter re-enters with
    // a second contribution, and the guard rejects it.
    coordinator.contribute(id, &addr("alice"), t0.plus(10)).unwrap();

    {
        let observed = adapter.observed.borrow();
        assert!(!observed.is_empty());
        for attempt in observed.iter() {
            let message = attempt.as_ref().unwrap_err();
            assert!(message.contains("in flight"), "unexpected error: {message}");
        }
    }

    // Only the outer contribution landed; ledgers saw nothing from the
    // nested call.
    let group = coordinator.group(id).unwrap();
    assert!(group.has_contributed(1, &addr("alice")));
    assert!(!group.has_contributed(1, &addr("bob")));
    assert_eq!(
        coordinator.escrow_balance(id).unwrap().principal,
        Amount::new(100)
    );

    // Bob's contribution still works once the outer call has finished.
    coordinator.contribute(id, &addr("bob"), t0.plus(20)).unwrap();
}
