use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::error::Result;

use super::decoder::ActivityDecoder;
use super::dispatch::DispatchRegistry;
use super::handler::{Collaborators, standard_registry};
use super::model::ActivityGraph;
use super::outbox::OutboxQueue;
use super::registry::TypeRegistry;
use super::repo::{ActorCache, FollowRepo, NoteRepo};

/// Receiving pipeline for one inbound delivery.
#[derive(Clone)]
pub struct Inbox {
    decoder: ActivityDecoder,
    dispatch: DispatchRegistry,
}

impl Inbox {
    pub fn new(decoder: ActivityDecoder, dispatch: DispatchRegistry) -> Inbox {
        Inbox { decoder, dispatch }
    }

    /// Wires the standard handlers to the stores in the configured keyspace.
    pub fn open(config: &RuntimeConfig) -> anyhow::Result<Inbox> {
        let keyspace = config.keyspace.clone();
        let apub = config.init.activity_pub.clone();
        let actors = ActorCache::new(keyspace.clone(), apub.base_url.clone())?;
        let collaborators = Collaborators {
            relationships: Arc::new(FollowRepo::new(keyspace.clone())?),
            actors: Arc::new(actors),
            notes: Arc::new(NoteRepo::new(keyspace.clone())?),
            delivery: Arc::new(OutboxQueue::new(keyspace)?),
        };
        let decoder = ActivityDecoder::new(Arc::new(TypeRegistry::new()), Arc::new(apub));
        let dispatch = standard_registry(&decoder, collaborators)?;
        Ok(Inbox::new(decoder, dispatch))
    }

    pub fn dispatch(&self) -> &DispatchRegistry {
        &self.dispatch
    }

    /// Decodes `raw`, then lets the handler of its root type process it.
    ///
    /// `origin` is the host the delivery was authenticated as.
    pub fn receive(&self, raw: &Value, origin: &str) -> Result<ActivityGraph> {
        let mut graph = self.decoder.decode(raw)?;
        graph.set_origin(origin);
        let root = graph.root();
        debug!(target: "apub", id = root.id(), kind = %root.activity_type(), origin, "inbox");
        self.dispatch
            .handler_for(root)?
            .process_incoming_request(&self.dispatch, root)?;
        Ok(graph)
    }
}
