use std::sync::Arc;

use tracing::{debug, info};

use crate::activity_pub::actor::{Actor, ActorStore};
use crate::activity_pub::decoder::ActivityDecoder;
use crate::activity_pub::dispatch::{DispatchRegistry, Handler};
use crate::activity_pub::model::{ActivityGraph, ActivityType, NodeRef};
use crate::error::Result;

/// Keeps the actor cache current from received Person documents.
pub struct PersonHandler {
    decoder: ActivityDecoder,
    actors: Arc<dyn ActorStore>,
}

impl PersonHandler {
    pub fn new(decoder: ActivityDecoder, actors: Arc<dyn ActorStore>) -> PersonHandler {
        PersonHandler { decoder, actors }
    }

    fn cache(&self, person: NodeRef<'_>) -> Result<()> {
        person.check_origin(person.id())?;
        match Actor::from_person(person) {
            Some(actor) => {
                info!(target: "apub", id = actor.id(), "actor cached");
                self.actors.upsert(actor)
            }
            None => {
                debug!(target: "apub", id = person.id(), "person without inbox, ignoring");
                Ok(())
            }
        }
    }
}

impl Handler for PersonHandler {
    fn process_incoming_request(&self, _dispatch: &DispatchRegistry, person: NodeRef<'_>) -> Result<()> {
        self.cache(person)
    }

    fn activity(&self, wrapper: NodeRef<'_>, person: NodeRef<'_>) -> Result<()> {
        match wrapper.activity_type() {
            ActivityType::Update | ActivityType::Create => self.cache(person),
            other => {
                debug!(target: "apub", id = person.id(), wrapper = %other, "no reaction");
                Ok(())
            }
        }
    }

    fn get_item_by_id(&self, id: &str) -> Result<ActivityGraph> {
        let actor = self.actors.resolve_by_id(id)?;
        self.decoder.decode(&actor.to_value())
    }

    fn save(&self, person: NodeRef<'_>) -> Result<()> {
        if let Some(actor) = Actor::from_person(person) {
            self.actors.upsert(actor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use serde_json::json;

    use crate::activity_pub::actor::ActorResolver;
    use crate::activity_pub::dispatch::{DispatchRegistry, Handler};
    use crate::activity_pub::model::{ActivityKind, ActivityType};
    use crate::activity_pub::registry::TypeRegistry;
    use crate::activity_pub::testing::{MemoryActors, decoder, person, receive};
    use crate::error::Error;

    use super::PersonHandler;

    const ALICE: &str = "https://remote.example/users/alice";

    fn dispatch() -> Result<DispatchRegistry> {
        struct Noop;
        impl Handler for Noop {}
        Ok(DispatchRegistry::builder(Arc::new(TypeRegistry::new()))
            .bind_all(ActivityType::ALL, Arc::new(Noop))
            .build()?)
    }

    #[test]
    fn incoming_person_is_cached() -> Result<()> {
        let actors = Arc::new(MemoryActors::default());
        let handler = PersonHandler::new(decoder(), actors.clone());
        let graph = receive(person(ALICE), "remote.example")?;
        handler.process_incoming_request(&dispatch()?, graph.root())?;

        let alice = actors.resolve_by_id(ALICE)?;
        assert!(!alice.is_local());
        assert_eq!(alice.inbox_url(), "https://remote.example/users/alice/inbox");

        let item = handler.get_item_by_id(ALICE)?;
        let ActivityKind::Person(fields) = item.root().kind() else {
            panic!("expected a person");
        };
        assert_eq!(fields.preferred_username, "alice");
        Ok(())
    }

    #[test]
    fn person_from_other_host_is_rejected() -> Result<()> {
        let actors = Arc::new(MemoryActors::default());
        let handler = PersonHandler::new(decoder(), actors.clone());
        let graph = receive(person(ALICE), "evil.example")?;
        let result = handler.process_incoming_request(&dispatch()?, graph.root());
        assert!(matches!(result, Err(Error::InvalidOrigin { .. })));
        assert!(matches!(
            actors.resolve_by_id(ALICE),
            Err(Error::ActorNotResolvable(_))
        ));
        Ok(())
    }

    #[test]
    fn update_refreshes_cached_actor() -> Result<()> {
        let actors = Arc::new(MemoryActors::default());
        let handler = PersonHandler::new(decoder(), actors.clone());
        let mut updated = person(ALICE);
        updated["inbox"] = json!("https://remote.example/inbox/alice");
        let graph = receive(
            json!({ "type": "Update", "actor": ALICE, "object": updated }),
            "remote.example",
        )?;
        let wrapper = graph.root();
        handler.activity(wrapper, wrapper.object().expect("person"))?;
        assert_eq!(
            actors.resolve_by_id(ALICE)?.inbox_url(),
            "https://remote.example/inbox/alice"
        );
        Ok(())
    }
}
