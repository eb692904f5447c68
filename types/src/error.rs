//! Shared error classification.
//!
//! Every ledger crate defines its own `thiserror` enum; this taxonomy is the
//! caller-facing classification those enums map onto via a `kind()` method.

use serde::{Deserialize, Serialize};

/// Coarse classification of a rejected operation.
///
/// There are no fatal errors in the core: every failure is a caller-visible
/// rejection, applied before any ledger mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Zero or out-of-range amount, malformed configuration, overflow.
    InvalidInput,
    /// Wrong lifecycle state, duplicate operation, closed window, cooldown,
    /// cap exceeded, reentrant call.
    PreconditionFailed,
    /// A ledger cannot cover the requested debit.
    InsufficientBalance,
    /// The caller lacks the required role or capability.
    Unauthorized,
    /// Unknown group, member, claim or record.
    NotFound,
}
