use std::sync::Arc;

use tracing::{debug, info};

use crate::activity_pub::decoder::ActivityDecoder;
use crate::activity_pub::dispatch::Handler;
use crate::activity_pub::model::{ActivityGraph, ActivityType, NodeRef};
use crate::error::{Error, Result};

/// Persistence of received notes, keyed by note IRI.
pub trait NoteStore: Send + Sync {
    fn save(&self, note: NodeRef<'_>) -> Result<()>;
    /// The JSON the note was decoded from.
    fn source_by_id(&self, id: &str) -> Result<Option<String>>;
    /// Returns whether a note was removed.
    fn delete(&self, id: &str) -> Result<bool>;
}

pub struct NoteHandler {
    decoder: ActivityDecoder,
    notes: Arc<dyn NoteStore>,
}

impl NoteHandler {
    pub fn new(decoder: ActivityDecoder, notes: Arc<dyn NoteStore>) -> NoteHandler {
        NoteHandler { decoder, notes }
    }
}

impl Handler for NoteHandler {
    fn activity(&self, wrapper: NodeRef<'_>, note: NodeRef<'_>) -> Result<()> {
        match wrapper.activity_type() {
            ActivityType::Create | ActivityType::Update => {
                wrapper.check_origin(note.id())?;
                wrapper.check_origin(wrapper.actor_id())?;
                self.notes.save(note)?;
                info!(target: "apub", id = note.id(), kind = %wrapper.activity_type(), "note stored");
            }
            ActivityType::Delete => {
                wrapper.check_origin(note.id())?;
                let removed = self.notes.delete(note.id())?;
                info!(target: "apub", id = note.id(), removed, "note deleted");
            }
            other => {
                debug!(target: "apub", id = note.id(), wrapper = %other, "no reaction");
            }
        }
        Ok(())
    }

    fn get_item_by_id(&self, id: &str) -> Result<ActivityGraph> {
        let source = self
            .notes
            .source_by_id(id)?
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        self.decoder.decode_str(&source)
    }

    fn save(&self, note: NodeRef<'_>) -> Result<()> {
        self.notes.save(note)
    }

    fn delete(&self, note: NodeRef<'_>) -> Result<()> {
        self.notes.delete(note.id())?;
        Ok(())
    }
}
