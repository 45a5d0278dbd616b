//! Per-type handlers and their standard wiring.

mod follow;
mod note;
mod passive;
mod person;
mod relay;
mod tombstone;

use std::sync::Arc;

pub use follow::FollowProtocol;
pub use note::{NoteHandler, NoteStore};
pub use passive::PassiveHandler;
pub use person::PersonHandler;
pub use relay::RelayHandler;
pub use tombstone::TombstoneHandler;

use crate::error::Result;

use super::actor::ActorStore;
use super::decoder::ActivityDecoder;
use super::dispatch::DispatchRegistry;
use super::model::ActivityType;
use super::outbox::OutboundDelivery;
use super::relationship::RelationshipStore;

/// External stores and transport the handlers act through.
pub struct Collaborators<A> {
    pub relationships: Arc<dyn RelationshipStore>,
    pub actors: Arc<A>,
    pub notes: Arc<dyn NoteStore>,
    pub delivery: Arc<dyn OutboundDelivery>,
}

const RELAYED: [ActivityType; 6] = [
    ActivityType::Accept,
    ActivityType::Reject,
    ActivityType::Undo,
    ActivityType::Create,
    ActivityType::Update,
    ActivityType::Delete,
];

const PASSIVE: [ActivityType; 7] = [
    ActivityType::Add,
    ActivityType::Block,
    ActivityType::Like,
    ActivityType::Remove,
    ActivityType::Image,
    ActivityType::Document,
    ActivityType::Notification,
];

/// Binds every registered type to its handler.
pub fn standard_registry<A>(
    decoder: &ActivityDecoder,
    collaborators: Collaborators<A>,
) -> Result<DispatchRegistry>
where
    A: ActorStore + 'static,
{
    let Collaborators {
        relationships,
        actors,
        notes,
        delivery,
    } = collaborators;
    let types = decoder.types().clone();
    let follow = FollowProtocol::new(
        types.clone(),
        decoder.cloud().clone(),
        relationships,
        actors.clone(),
        delivery,
    );
    DispatchRegistry::builder(types)
        .bind_all(RELAYED, Arc::new(RelayHandler))
        .bind_all(PASSIVE, Arc::new(PassiveHandler))
        .bind(ActivityType::Follow, Arc::new(follow))
        .bind(
            ActivityType::Note,
            Arc::new(NoteHandler::new(decoder.clone(), notes.clone())),
        )
        .bind(ActivityType::Tombstone, Arc::new(TombstoneHandler::new(notes)))
        .bind(
            ActivityType::Person,
            Arc::new(PersonHandler::new(decoder.clone(), actors)),
        )
        .build()
}
