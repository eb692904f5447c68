//! In-memory store backend.
//!
//! Implements every store trait over plain hash maps behind an `RwLock`.
//! Used by tests and tooling; a durable backend would live in its own crate.

use std::collections::HashMap;
use std::sync::RwLock;

use susu_types::{ClaimId, GroupId, MemberAddress};

use crate::error::StoreError;
use crate::{EscrowStore, GroupStore, InsuranceStore, StakeStore};

#[derive(Default)]
struct Tables {
    groups: HashMap<GroupId, Vec<u8>>,
    stakes: HashMap<(GroupId, MemberAddress), Vec<u8>>,
    trust: HashMap<MemberAddress, Vec<u8>>,
    balances: HashMap<GroupId, Vec<u8>>,
    pools: HashMap<GroupId, Vec<u8>>,
    claims: HashMap<ClaimId, (GroupId, Vec<u8>)>,
    meta: HashMap<Vec<u8>, Vec<u8>>,
}

/// Non-durable store holding every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }
}

impl GroupStore for MemoryStore {
    fn get_group(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.groups.get(&group).cloned())
    }

    fn put_group(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError> {
        self.write()?.groups.insert(group, bytes.to_vec());
        Ok(())
    }

    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError> {
        Ok(self
            .read()?
            .groups
            .iter()
            .map(|(id, bytes)| (*id, bytes.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.meta.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.write()?.meta.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl StakeStore for MemoryStore {
    fn get_stake(
        &self,
        group: GroupId,
        member: &MemberAddress,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.stakes.get(&(group, member.clone())).cloned())
    }

    fn put_stake(
        &self,
        group: GroupId,
        member: &MemberAddress,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.write()?
            .stakes
            .insert((group, member.clone()), bytes.to_vec());
        Ok(())
    }

    fn scan_group_stakes(
        &self,
        group: GroupId,
    ) -> Result<Vec<(MemberAddress, Vec<u8>)>, StoreError> {
        Ok(self
            .read()?
            .stakes
            .iter()
            .filter(|((g, _), _)| *g == group)
            .map(|((_, member), bytes)| (member.clone(), bytes.clone()))
            .collect())
    }

    fn get_trust(&self, member: &MemberAddress) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.trust.get(member).cloned())
    }

    fn put_trust(&self, member: &MemberAddress, bytes: &[u8]) -> Result<(), StoreError> {
        self.write()?.trust.insert(member.clone(), bytes.to_vec());
        Ok(())
    }

    fn iter_trust(&self) -> Result<Vec<(MemberAddress, Vec<u8>)>, StoreError> {
        Ok(self
            .read()?
            .trust
            .iter()
            .map(|(member, bytes)| (member.clone(), bytes.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.meta.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.write()?.meta.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl EscrowStore for MemoryStore {
    fn get_balance(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.balances.get(&group).cloned())
    }

    fn put_balance(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError> {
        self.write()?.balances.insert(group, bytes.to_vec());
        Ok(())
    }

    fn iter_balances(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError> {
        Ok(self
            .read()?
            .balances
            .iter()
            .map(|(id, bytes)| (*id, bytes.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.meta.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.write()?.meta.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl InsuranceStore for MemoryStore {
    fn get_pool(&self, group: GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.pools.get(&group).cloned())
    }

    fn put_pool(&self, group: GroupId, bytes: &[u8]) -> Result<(), StoreError> {
        self.write()?.pools.insert(group, bytes.to_vec());
        Ok(())
    }

    fn get_claim(&self, claim: ClaimId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.claims.get(&claim).map(|(_, b)| b.clone()))
    }

    fn put_claim(&self, claim: ClaimId, group: GroupId, bytes: &[u8]) -> Result<(), StoreError> {
        self.write()?.claims.insert(claim, (group, bytes.to_vec()));
        Ok(())
    }

    fn scan_group_claims(&self, group: GroupId) -> Result<Vec<(ClaimId, Vec<u8>)>, StoreError> {
        let mut claims: Vec<(ClaimId, Vec<u8>)> = self
            .read()?
            .claims
            .iter()
            .filter(|(_, (g, _))| *g == group)
            .map(|(id, (_, bytes))| (*id, bytes.clone()))
            .collect();
        claims.sort_by_key(|(id, _)| *id);
        Ok(claims)
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.meta.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.write()?.meta.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
