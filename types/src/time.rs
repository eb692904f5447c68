//! Timestamp type used throughout the protocol.
//!
//! Timestamps are Unix epoch seconds (UTC). Every operation takes `now` as
//! an explicit argument so the whole system stays deterministic and
//! replayable; nothing in the core reads the system clock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by a duration, saturating at the max.
    pub fn plus(&self, duration_secs: u64) -> Self {
        Self(self.0.saturating_add(duration_secs))
    }

    /// Seconds elapsed since this timestamp (zero if `now` is earlier).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `now` falls inside `[self, self + duration_secs]`, inclusive.
    ///
    /// Contribution windows use the closed upper bound: a payment landing in
    /// the very last second of the grace period still counts.
    pub fn within_window(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0 && now.0 <= self.0.saturating_add(duration_secs)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
