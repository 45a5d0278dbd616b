use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::debug;

use crate::activity_pub::relationship::{FollowRelationship, RelationshipStore};
use crate::error::Error;

use super::xkey::PairKey;

/// Follow relationships keyed by `(actor, object)`.
///
/// Every read-then-write runs under one store wide lock, so mutations of a
/// pair never interleave.
#[derive(Clone)]
pub struct FollowRepo {
    keyspace: Keyspace,
    follows: PartitionHandle,
    lock: Arc<Mutex<()>>,
}

impl FollowRepo {
    pub fn new(keyspace: Keyspace) -> Result<FollowRepo> {
        let follows = keyspace.open_partition("follows", PartitionCreateOptions::default())?;
        Ok(FollowRepo {
            keyspace,
            follows,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| anyhow!("follow store lock poisoned"))
    }

    fn get(&self, key: &PairKey) -> Result<Option<FollowRelationship>> {
        match self.follows.get(key)? {
            Some(bytes) => Ok(Some(
                minicbor::decode(&bytes).context("corrupted follow relationship")?,
            )),
            None => Ok(None),
        }
    }

    fn put(&self, key: PairKey, relationship: &FollowRelationship) -> Result<()> {
        let bytes = minicbor::to_vec(relationship)?;
        self.follows.insert(key, bytes)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn find(&self, actor_id: &str, object_id: &str) -> Result<Option<FollowRelationship>> {
        self.get(&PairKey::new(actor_id, object_id)?)
    }

    fn insert_if_absent(&self, relationship: &FollowRelationship) -> Result<bool> {
        let _guard = self.lock()?;
        let key = PairKey::new(&relationship.actor_id, &relationship.object_id)?;
        if self.get(&key)?.is_some() {
            return Ok(false);
        }
        self.put(key, relationship)?;
        Ok(true)
    }

    fn accept(&self, relationship: &FollowRelationship) -> Result<bool> {
        let _guard = self.lock()?;
        let key = PairKey::new(&relationship.actor_id, &relationship.object_id)?;
        match self.get(&key)? {
            Some(mut stored) if stored.id == relationship.id => {
                stored.accepted = true;
                self.put(key, &stored)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove(&self, relationship: &FollowRelationship) -> Result<bool> {
        let _guard = self.lock()?;
        let key = PairKey::new(&relationship.actor_id, &relationship.object_id)?;
        match self.get(&key)? {
            Some(stored) if stored.id == relationship.id => {
                self.follows.remove(key)?;
                self.keyspace.persist(PersistMode::SyncAll)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl RelationshipStore for FollowRepo {
    fn find_by_pair(
        &self,
        actor_id: &str,
        object_id: &str,
    ) -> crate::Result<Option<FollowRelationship>> {
        self.find(actor_id, object_id).map_err(Error::storage)
    }

    fn save(&self, relationship: &FollowRelationship) -> crate::Result<bool> {
        let inserted = self.insert_if_absent(relationship).map_err(Error::storage)?;
        debug!(target: "apub", id = %relationship.id, inserted, "save follow");
        Ok(inserted)
    }

    fn mark_accepted(&self, relationship: &FollowRelationship) -> crate::Result<()> {
        let updated = self.accept(relationship).map_err(Error::storage)?;
        debug!(target: "apub", id = %relationship.id, updated, "accept follow");
        Ok(())
    }

    fn delete(&self, relationship: &FollowRelationship) -> crate::Result<()> {
        let removed = self.remove(relationship).map_err(Error::storage)?;
        debug!(target: "apub", id = %relationship.id, removed, "delete follow");
        Ok(())
    }
}
