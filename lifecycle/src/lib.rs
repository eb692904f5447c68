//! Group lifecycle coordination for the susu protocol.
//!
//! A group moves `Created → Active → Completed`, pausing and cancelling
//! along the way, while the coordinator routes every unit of value through
//! the stake, escrow and insurance ledgers. All operations take `now`
//! explicitly; nothing here reads a clock.

pub mod coordinator;
pub mod error;
pub mod group;
pub mod guard;

pub use coordinator::GroupCoordinator;
pub use error::LifecycleError;
pub use group::{Contribution, ContributionStatus, Group, GroupStatus, Member, Payout};
pub use guard::ReentrancyGuard;
