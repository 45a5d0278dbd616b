//! Follow handshake: request, accept or reject, undo.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity_pub::actor::ActorResolver;
use crate::activity_pub::decoder::CloudAddress;
use crate::activity_pub::dispatch::{DispatchRegistry, Handler};
use crate::activity_pub::instance_path::{DeliveryQueue, InstancePath, Priority};
use crate::activity_pub::model::{ActivityGraph, ActivityType, NodeId, NodeRef};
use crate::activity_pub::outbox::OutboundDelivery;
use crate::activity_pub::registry::TypeRegistry;
use crate::activity_pub::relationship::{FollowRelationship, RelationshipStore};
use crate::error::{Error, Result};

pub struct FollowProtocol {
    types: Arc<TypeRegistry>,
    cloud: Arc<dyn CloudAddress>,
    relationships: Arc<dyn RelationshipStore>,
    actors: Arc<dyn ActorResolver>,
    delivery: Arc<dyn OutboundDelivery>,
}

impl FollowProtocol {
    pub fn new(
        types: Arc<TypeRegistry>,
        cloud: Arc<dyn CloudAddress>,
        relationships: Arc<dyn RelationshipStore>,
        actors: Arc<dyn ActorResolver>,
        delivery: Arc<dyn OutboundDelivery>,
    ) -> FollowProtocol {
        FollowProtocol {
            types,
            cloud,
            relationships,
            actors,
            delivery,
        }
    }

    /// Accepts `follow` on behalf of its local target.
    ///
    /// Never fails: the remote side retries its Follow if the Accept is lost,
    /// and the relationship stays pending until a handoff succeeds.
    pub fn confirm_follow_request(&self, relationship: &FollowRelationship, follow: NodeRef<'_>) {
        if let Err(error) = self.try_confirm(relationship, follow) {
            warn!(target: "apub", id = %relationship.id, %error, "unable to confirm follow");
        }
    }

    fn try_confirm(&self, relationship: &FollowRelationship, follow: NodeRef<'_>) -> Result<()> {
        let follower = self.actors.resolve_by_id(&relationship.actor_id)?;
        let accept = self.build_accept(follow);
        let path = InstancePath::new(follower.inbox_url(), DeliveryQueue::Inbox, Priority::Top);
        self.delivery.send(accept.root(), &[path])?;
        self.relationships.mark_accepted(relationship)?;
        info!(
            target: "apub",
            id = %relationship.id,
            follower = %relationship.actor_id,
            accept = accept.root().id(),
            "follow accepted"
        );
        Ok(())
    }

    /// An Accept by the followed actor, embedding a copy of `follow`.
    pub fn build_accept(&self, follow: NodeRef<'_>) -> ActivityGraph {
        let cloud = self.cloud.current_address();
        let mut accept = self.types.create(ActivityType::Accept);
        accept.id = format!("{cloud}/#accept/follows/{}", Uuid::now_v7().simple());
        accept.actor_id = follow.object_id().to_string();
        accept.url_cloud = cloud;
        let mut graph = ActivityGraph::new(accept);
        graph.graft_object(NodeId::ROOT, follow);
        graph
    }

    fn handle_new_follow(&self, follow: NodeRef<'_>) -> Result<()> {
        let target = match self.actors.resolve_by_id(follow.object_id()) {
            Ok(target) => target,
            Err(Error::ActorNotResolvable(id)) => {
                debug!(target: "apub", id = follow.id(), object = %id, "dropping follow of unknown actor");
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        if !target.is_local() {
            debug!(target: "apub", id = follow.id(), object = target.id(), "dropping follow of remote actor");
            return Ok(());
        }
        let relationship = FollowRelationship::pending(follow).with_follow_id(target.followers_url());
        if !self.relationships.save(&relationship)? {
            debug!(target: "apub", id = follow.id(), "another follow for the pair was stored first");
            return Ok(());
        }
        self.confirm_follow_request(&relationship, follow);
        Ok(())
    }
}

impl Handler for FollowProtocol {
    fn process_incoming_request(&self, _dispatch: &DispatchRegistry, follow: NodeRef<'_>) -> Result<()> {
        follow.check_origin(follow.actor_id())?;
        match self
            .relationships
            .find_by_pair(follow.actor_id(), follow.object_id())?
        {
            Some(existing) if existing.id == follow.id() && !existing.accepted => {
                debug!(target: "apub", id = follow.id(), "follow retransmitted, confirming again");
                self.confirm_follow_request(&existing, follow);
                Ok(())
            }
            Some(existing) => {
                debug!(
                    target: "apub",
                    id = follow.id(),
                    existing = %existing.id,
                    accepted = existing.accepted,
                    "follow already known"
                );
                Ok(())
            }
            None => self.handle_new_follow(follow),
        }
    }

    fn activity(&self, wrapper: NodeRef<'_>, follow: NodeRef<'_>) -> Result<()> {
        if follow.object_id().is_empty() {
            debug!(
                target: "apub",
                id = follow.id(),
                wrapper = %wrapper.activity_type(),
                "embedded follow has no object, ignoring"
            );
            return Ok(());
        }
        let relationship = FollowRelationship::pending(follow);
        match wrapper.activity_type() {
            ActivityType::Undo => {
                wrapper.check_origin(follow.id())?;
                wrapper.check_origin(follow.actor_id())?;
                self.relationships.delete(&relationship)?;
                info!(target: "apub", id = follow.id(), "follow undone");
            }
            ActivityType::Reject => {
                wrapper.check_origin(follow.object_id())?;
                self.relationships.delete(&relationship)?;
                info!(target: "apub", id = follow.id(), "follow rejected");
            }
            ActivityType::Accept => {
                wrapper.check_origin(follow.object_id())?;
                self.relationships.mark_accepted(&relationship)?;
                info!(target: "apub", id = follow.id(), "follow accepted by remote");
            }
            other => {
                debug!(target: "apub", id = follow.id(), wrapper = %other, "no reaction");
            }
        }
        Ok(())
    }

    fn save(&self, follow: NodeRef<'_>) -> Result<()> {
        self.relationships.save(&FollowRelationship::pending(follow))?;
        Ok(())
    }

    fn delete(&self, follow: NodeRef<'_>) -> Result<()> {
        self.relationships.delete(&FollowRelationship::pending(follow))
    }
}
