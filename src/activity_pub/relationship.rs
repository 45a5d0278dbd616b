use minicbor::{Decode, Encode};

use crate::error::Result;

use super::model::NodeRef;

/// A follow between two actors, pending until the followed actor accepts.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FollowRelationship {
    /// IRI of the Follow activity.
    #[n(0)]
    pub id: String,
    /// The follower.
    #[n(1)]
    pub actor_id: String,
    /// The followed actor.
    #[n(2)]
    pub object_id: String,
    /// Followers collection of the followed actor, when known.
    #[n(3)]
    pub follow_id: String,
    #[n(4)]
    pub accepted: bool,
}

impl FollowRelationship {
    pub fn pending(follow: NodeRef<'_>) -> FollowRelationship {
        FollowRelationship {
            id: follow.id().to_string(),
            actor_id: follow.actor_id().to_string(),
            object_id: follow.object_id().to_string(),
            follow_id: String::new(),
            accepted: false,
        }
    }
    pub fn with_follow_id(mut self, follow_id: impl Into<String>) -> FollowRelationship {
        self.follow_id = follow_id.into();
        self
    }
}

/// Storage for follow relationships, at most one per (actor, object) pair.
///
/// Implementations must make each call atomic with respect to the pair so that
/// concurrent handshakes cannot leave a partial relationship behind.
pub trait RelationshipStore: Send + Sync {
    fn find_by_pair(&self, actor_id: &str, object_id: &str) -> Result<Option<FollowRelationship>>;
    /// Stores a new relationship. An existing one for the pair is kept, and
    /// `false` is returned.
    fn save(&self, relationship: &FollowRelationship) -> Result<bool>;
    /// Marks the stored relationship with the same id as accepted.
    fn mark_accepted(&self, relationship: &FollowRelationship) -> Result<()>;
    /// Removes the stored relationship with the same id.
    fn delete(&self, relationship: &FollowRelationship) -> Result<()>;
}
