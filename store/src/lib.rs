//! Abstract storage traits for the susu protocol.
//!
//! Every storage backend (embedded KV, SQL, in-memory for testing)
//! implements these traits. The ledger engines depend only on the traits
//! and serialize their own record types; the store deals in opaque bytes,
//! which keeps it free of circular dependencies on the engine crates.
//!
//! The persisted shape is exactly what the core queries: point lookups by
//! key plus "all records for a group" scans. Nothing else.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use susu_types::{ClaimId, GroupId, MemberAddress};

/// Group lifecycle records, one blob per group, plus registry metadata
/// (the next group id lives under a meta key).
pub trait GroupStore {
    fn get_group(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_group(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError>;
    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}

/// Stake and trust records: stake keyed by (group, member), trust keyed by
/// member alone (trust is platform-wide).
pub trait StakeStore {
    fn get_stake(
        &self,
        group: GroupId,
        member: &MemberAddress,
    ) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_stake(
        &self,
        group: GroupId,
        member: &MemberAddress,
        bytes: &[u8],
    ) -> Result<(), StoreError>;
    fn scan_group_stakes(
        &self,
        group: GroupId,
    ) -> Result<Vec<(MemberAddress, Vec<u8>)>, StoreError>;

    fn get_trust(&self, member: &MemberAddress) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_trust(&self, member: &MemberAddress, bytes: &[u8]) -> Result<(), StoreError>;
    fn iter_trust(&self) -> Result<Vec<(MemberAddress, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}

/// Escrow balances, one blob per group, plus global cash-position metadata.
pub trait EscrowStore {
    fn get_balance(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_balance(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError>;
    fn iter_balances(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}

/// Insurance pools keyed by group and claims keyed by claim id, with a
/// per-group claim scan for history queries.
pub trait InsuranceStore {
    fn get_pool(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_pool(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError>;

    fn get_claim(&self, claim: ClaimId) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_claim(&self, claim: ClaimId, group: GroupId, bytes: &[u8]) -> Result<(), StoreError>;
    fn scan_group_claims(&self, group: GroupId) -> Result<Vec<(ClaimId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}
