//! In-memory collaborators for handler tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::{Value, json};

use crate::error::{Error, Result};

use super::actor::{Actor, ActorResolver, ActorStore};
use super::decoder::ActivityDecoder;
use super::instance_path::InstancePath;
use super::model::{ActivityGraph, NodeRef};
use super::outbox::OutboundDelivery;
use super::registry::TypeRegistry;
use super::relationship::{FollowRelationship, RelationshipStore};

pub(crate) const LOCAL: &str = "https://local.example";

pub(crate) fn decoder() -> ActivityDecoder {
    ActivityDecoder::new(Arc::new(TypeRegistry::new()), Arc::new(LOCAL.to_string()))
}

/// Decodes `raw` as if it arrived from `origin`.
pub(crate) fn receive(raw: Value, origin: &str) -> anyhow::Result<ActivityGraph> {
    let mut graph = decoder().decode(&raw)?;
    graph.set_origin(origin);
    Ok(graph)
}

pub(crate) fn person(id: &str) -> Value {
    json!({
        "type": "Person",
        "id": id,
        "preferredUsername": id.rsplit('/').next().unwrap_or_default(),
        "inbox": format!("{id}/inbox"),
        "followers": format!("{id}/followers"),
    })
}

#[derive(Default)]
pub(crate) struct MemoryRelationships {
    rows: Mutex<BTreeMap<(String, String), FollowRelationship>>,
}

impl MemoryRelationships {
    pub(crate) fn rows(&self) -> Vec<FollowRelationship> {
        self.rows.lock().expect("lock").values().cloned().collect()
    }
    pub(crate) fn insert(&self, relationship: FollowRelationship) {
        let key = (relationship.actor_id.clone(), relationship.object_id.clone());
        self.rows.lock().expect("lock").insert(key, relationship);
    }
}

impl RelationshipStore for MemoryRelationships {
    fn find_by_pair(&self, actor_id: &str, object_id: &str) -> Result<Option<FollowRelationship>> {
        let rows = self.rows.lock().expect("lock");
        Ok(rows
            .get(&(actor_id.to_string(), object_id.to_string()))
            .cloned())
    }
    fn save(&self, relationship: &FollowRelationship) -> Result<bool> {
        let key = (relationship.actor_id.clone(), relationship.object_id.clone());
        let mut rows = self.rows.lock().expect("lock");
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, relationship.clone());
        Ok(true)
    }
    fn mark_accepted(&self, relationship: &FollowRelationship) -> Result<()> {
        let key = (relationship.actor_id.clone(), relationship.object_id.clone());
        if let Some(stored) = self.rows.lock().expect("lock").get_mut(&key) {
            if stored.id == relationship.id {
                stored.accepted = true;
            }
        }
        Ok(())
    }
    fn delete(&self, relationship: &FollowRelationship) -> Result<()> {
        let key = (relationship.actor_id.clone(), relationship.object_id.clone());
        let mut rows = self.rows.lock().expect("lock");
        if rows.get(&key).is_some_and(|stored| stored.id == relationship.id) {
            rows.remove(&key);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryActors {
    actors: Mutex<BTreeMap<String, Actor>>,
}

impl MemoryActors {
    pub(crate) fn with(actors: impl IntoIterator<Item = Actor>) -> MemoryActors {
        let store = MemoryActors::default();
        for actor in actors {
            store
                .actors
                .lock()
                .expect("lock")
                .insert(actor.id().to_string(), actor);
        }
        store
    }
}

impl ActorResolver for MemoryActors {
    fn resolve_by_id(&self, id: &str) -> Result<Actor> {
        self.actors
            .lock()
            .expect("lock")
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ActorNotResolvable(id.to_string()))
    }
}

impl ActorStore for MemoryActors {
    fn upsert(&self, actor: Actor) -> Result<()> {
        self.actors
            .lock()
            .expect("lock")
            .insert(actor.id().to_string(), actor);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub(crate) activity: Value,
    pub(crate) paths: Vec<InstancePath>,
}

/// Records every handoff, failing them all while `failing` is set.
#[derive(Default)]
pub(crate) struct RecordingDelivery {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingDelivery {
    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("lock").clone()
    }
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl OutboundDelivery for RecordingDelivery {
    fn send(&self, activity: NodeRef<'_>, paths: &[InstancePath]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Delivery(anyhow!("transport unavailable")));
        }
        self.sent.lock().expect("lock").push(Sent {
            activity: activity.to_value(),
            paths: paths.to_vec(),
        });
        Ok(())
    }
}
