use std::sync::Arc;

use tracing::{debug, info};

use crate::activity_pub::dispatch::Handler;
use crate::activity_pub::model::{ActivityType, NodeRef};
use crate::error::Result;

use super::note::NoteStore;

/// Deletes announced with a Tombstone in place of the deleted note.
pub struct TombstoneHandler {
    notes: Arc<dyn NoteStore>,
}

impl TombstoneHandler {
    pub fn new(notes: Arc<dyn NoteStore>) -> TombstoneHandler {
        TombstoneHandler { notes }
    }
}

impl Handler for TombstoneHandler {
    fn activity(&self, wrapper: NodeRef<'_>, tombstone: NodeRef<'_>) -> Result<()> {
        if !wrapper.type_is(ActivityType::Delete) {
            debug!(target: "apub", id = tombstone.id(), wrapper = %wrapper.activity_type(), "no reaction");
            return Ok(());
        }
        tombstone.check_origin(tombstone.id())?;
        let removed = self.notes.delete(tombstone.id())?;
        info!(target: "apub", id = tombstone.id(), removed, "tombstoned");
        Ok(())
    }
}
