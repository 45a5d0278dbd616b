use anyhow::{Context, Result};
use fjall::{
    GarbageCollection, Keyspace, KvSeparationOptions, PartitionCreateOptions, PartitionHandle,
    PersistMode,
};
use minicbor::{Decode, Encode};

use crate::activity_pub::handler::NoteStore;
use crate::activity_pub::model::{ActivityKind, NodeRef};
use crate::error::Error;

use super::xkey::check_key;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct StoredNote {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub attributed_to: String,
    /// JSON the note was decoded from.
    #[n(2)]
    pub source: String,
}

#[derive(Clone)]
pub struct NoteRepo {
    keyspace: Keyspace,
    notes: PartitionHandle,
}

impl NoteRepo {
    pub fn new(keyspace: Keyspace) -> Result<NoteRepo> {
        let notes = keyspace.open_partition(
            "notes",
            PartitionCreateOptions::default().with_kv_separation(KvSeparationOptions::default()),
        )?;
        Ok(NoteRepo { keyspace, notes })
    }

    /// Reclaims blob space left behind by deleted or rewritten notes.
    pub(crate) fn gc(&self) -> Result<()> {
        self.notes.gc_with_staleness_threshold(0.5)?;
        Ok(())
    }

    pub fn find_one(&self, id: &str) -> Result<Option<StoredNote>> {
        check_key(id.as_bytes())?;
        match self.notes.get(id)? {
            Some(bytes) => Ok(Some(
                minicbor::decode(&bytes).context("corrupted note record")?,
            )),
            None => Ok(None),
        }
    }

    pub fn insert(&self, note: &StoredNote) -> Result<()> {
        check_key(note.id.as_bytes())?;
        let bytes = minicbor::to_vec(note)?;
        self.notes.insert(note.id.as_str(), bytes)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        check_key(id.as_bytes())?;
        if !self.notes.contains_key(id)? {
            return Ok(false);
        }
        self.notes.remove(id)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(true)
    }
}

impl NoteStore for NoteRepo {
    fn save(&self, note: NodeRef<'_>) -> crate::Result<()> {
        let attributed_to = match note.kind() {
            ActivityKind::Note(fields) if !fields.attributed_to.is_empty() => {
                fields.attributed_to.clone()
            }
            _ => note.actor_id().to_string(),
        };
        let stored = StoredNote {
            id: note.id().to_string(),
            attributed_to,
            source: note.source(),
        };
        self.insert(&stored).map_err(Error::storage)
    }

    fn source_by_id(&self, id: &str) -> crate::Result<Option<String>> {
        Ok(self.find_one(id).map_err(Error::storage)?.map(|n| n.source))
    }

    fn delete(&self, id: &str) -> crate::Result<bool> {
        self.remove(id).map_err(Error::storage)
    }
}
