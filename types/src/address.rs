//! Member account address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account address on the settlement layer, as an opaque string.
///
/// The core never interprets the address beyond equality and hashing; the
/// external `ValueTransfer` implementation owns the actual account model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberAddress(String);

impl MemberAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Well-formed means non-empty; everything else is the transfer layer's
    /// concern.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberAddress {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for MemberAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}
