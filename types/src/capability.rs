//! Capability handles gating ledger access.
//!
//! Each ledger issues one capability per group at wiring time; every
//! group-scoped ledger operation must present it. This replaces a mutable
//! "who may call whom" role map with an unforgeable-by-convention handle
//! fixed at group creation.

use crate::GroupId;
use serde::{Deserialize, Serialize};

/// Permission to operate on one group's records inside one ledger.
///
/// Issued by the ledger itself; the issuing ledger remembers the token and
/// rejects any capability whose token does not match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    group: GroupId,
    token: u64,
}

impl Capability {
    /// Only ledgers construct capabilities, at grant time.
    pub fn issue(group: GroupId, token: u64) -> Self {
        Self { group, token }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}
