mod kind;
mod node;
mod raw;

pub use kind::{
    Activity, ActivityKind, ActivityType, Document, Note, Notification, Person, Tombstone,
};
pub use node::{ActivityGraph, ActivityNode, NodeId, NodeRef};

pub(crate) use node::Slot;
pub(crate) use raw::RawObject;
