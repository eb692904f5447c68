//! Per-group reentrancy guard.
//!
//! Every mutating coordinator operation acquires the guard for its group
//! before touching any state. A nested call for the same group, say a
//! yield adapter calling back into the coordinator mid-deposit, fails the
//! acquire and gets a clean error instead of corrupting ledger state.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use susu_types::GroupId;

/// Tracks which groups have an operation in flight.
#[derive(Clone, Default)]
pub struct ReentrancyGuard {
    held: Rc<RefCell<HashSet<GroupId>>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for a group. Fails if an operation on that group
    /// is already running. Released when the returned token drops.
    pub fn enter(&self, group: GroupId) -> Option<GuardToken> {
        if !self.held.borrow_mut().insert(group) {
            return None;
        }
        Some(GuardToken {
            held: Rc::clone(&self.held),
            group,
        })
    }

    pub fn is_held(&self, group: GroupId) -> bool {
        self.held.borrow().contains(&group)
    }
}

/// RAII release: drops the group out of the in-flight set, including on the
/// error path of the guarded operation.
pub struct GuardToken {
    held: Rc<RefCell<HashSet<GroupId>>>,
    group: GroupId,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.held.borrow_mut().remove(&self.group);
    }
}
