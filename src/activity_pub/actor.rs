use minicbor::{Decode, Encode};
use serde_json::{Value, json};

use crate::config::ActivityPubConfig;
use crate::error::Result;

use super::model::{ActivityKind, NodeRef};

/// Cached view of a federated identity.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Actor {
    #[n(0)]
    id: String,
    #[n(1)]
    preferred_username: String,
    #[n(2)]
    inbox: String,
    #[n(3)]
    shared_inbox: Option<String>,
    #[n(4)]
    followers: String,
    #[n(5)]
    local: bool,
}

/// Resolves actors by IRI. Fails with `ActorNotResolvable` for unknown ones.
pub trait ActorResolver: Send + Sync {
    fn resolve_by_id(&self, id: &str) -> Result<Actor>;
}

/// Resolver that can also learn about actors.
pub trait ActorStore: ActorResolver {
    fn upsert(&self, actor: Actor) -> Result<()>;
}

impl Actor {
    /// An actor hosted by this server.
    pub fn local(config: &ActivityPubConfig, uid: &str) -> Actor {
        let id = config.user_iri(uid);
        Actor {
            inbox: format!("{id}/inbox"),
            shared_inbox: Some(format!("{}/inbox", config.base_url)),
            followers: format!("{id}/followers"),
            preferred_username: uid.to_string(),
            id,
            local: true,
        }
    }

    /// Builds a remote actor from a decoded Person. Needs both id and inbox.
    pub fn from_person(person: NodeRef<'_>) -> Option<Actor> {
        let ActivityKind::Person(fields) = person.kind() else {
            return None;
        };
        if person.id().is_empty() || fields.inbox.is_empty() {
            return None;
        }
        Some(Actor {
            id: person.id().to_string(),
            preferred_username: fields.preferred_username.clone(),
            inbox: fields.inbox.clone(),
            shared_inbox: fields.shared_inbox.clone(),
            followers: fields.followers.clone().unwrap_or_default(),
            local: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn is_local(&self) -> bool {
        self.local
    }
    pub fn inbox_url(&self) -> &str {
        &self.inbox
    }
    pub fn shared_inbox_url(&self) -> Option<&str> {
        self.shared_inbox.as_deref()
    }
    pub fn followers_url(&self) -> &str {
        &self.followers
    }
    pub(crate) fn with_local(mut self, local: bool) -> Actor {
        self.local = local;
        self
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Person",
            "id": self.id,
            "preferredUsername": self.preferred_username,
            "inbox": self.inbox,
            "followers": self.followers,
        });
        if self.local {
            value["outbox"] = Value::String(format!("{}/outbox", self.id));
            value["following"] = Value::String(format!("{}/following", self.id));
        }
        if let Some(shared_inbox) = &self.shared_inbox {
            value["endpoints"] = json!({ "sharedInbox": shared_inbox });
        }
        value
    }
}
