pub mod actor;
pub mod decoder;
pub(crate) mod delivery;
pub mod dispatch;
pub mod handler;
pub mod inbox;
pub mod instance_path;
mod mailman;
pub mod model;
pub mod outbox;
pub mod registry;
pub mod relationship;
pub mod repo;

#[cfg(test)]
pub(crate) mod testing;

pub use actor::{Actor, ActorResolver, ActorStore};
pub use decoder::{ActivityDecoder, CloudAddress, MAX_IRI_LENGTH, REDUNDANCY_LIMIT};
pub use dispatch::{DispatchRegistry, Handler};
pub use inbox::Inbox;
pub use instance_path::{DeliveryQueue, InstancePath, Priority};
pub use outbox::{OutboundDelivery, OutboxQueue};
pub use registry::TypeRegistry;
pub use relationship::{FollowRelationship, RelationshipStore};
