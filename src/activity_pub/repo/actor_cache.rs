use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::debug;

use crate::activity_pub::actor::{Actor, ActorResolver, ActorStore};
use crate::error::Error;

use super::xkey::check_key;

/// Actors we know about, local or remote, keyed by IRI.
#[derive(Clone)]
pub struct ActorCache {
    keyspace: Keyspace,
    actors: PartitionHandle,
    base_url: String,
}

impl ActorCache {
    pub fn new(keyspace: Keyspace, base_url: impl Into<String>) -> Result<ActorCache> {
        let actors = keyspace.open_partition("actors", PartitionCreateOptions::default())?;
        Ok(ActorCache {
            keyspace,
            actors,
            base_url: base_url.into(),
        })
    }

    pub fn find_one(&self, id: &str) -> Result<Option<Actor>> {
        check_key(id.as_bytes())?;
        let Some(bytes) = self.actors.get(id)? else {
            return Ok(None);
        };
        let actor: Actor = minicbor::decode(&bytes).context("corrupted actor record")?;
        Ok(Some(actor.with_local(self.is_local(id))))
    }

    pub fn insert(&self, actor: &Actor) -> Result<()> {
        check_key(actor.id().as_bytes())?;
        let bytes = minicbor::to_vec(actor)?;
        self.actors.insert(actor.id(), bytes)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn is_local(&self, id: &str) -> bool {
        id.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl ActorResolver for ActorCache {
    fn resolve_by_id(&self, id: &str) -> crate::Result<Actor> {
        self.find_one(id)
            .map_err(Error::storage)?
            .ok_or_else(|| Error::ActorNotResolvable(id.to_string()))
    }
}

impl ActorStore for ActorCache {
    fn upsert(&self, actor: Actor) -> crate::Result<()> {
        // A remote document can never claim to be one of ours.
        let local = self.is_local(actor.id());
        let actor = actor.with_local(local);
        debug!(target: "apub", id = actor.id(), local = actor.is_local(), "cache actor");
        self.insert(&actor).map_err(Error::storage)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use fjall::Config;
    use tempfile::tempdir;

    use crate::activity_pub::actor::{Actor, ActorResolver, ActorStore};
    use crate::config::ActivityPubConfig;
    use crate::error::Error;

    use super::ActorCache;

    #[test]
    fn resolves_local_and_rejects_unknown() -> Result<()> {
        let tmp_dir = tempdir()?;
        let keyspace = Config::new(tmp_dir.path()).temporary(true).open()?;
        let config = ActivityPubConfig {
            base_url: "https://social.example.com".to_string(),
        };
        let cache = ActorCache::new(keyspace, config.base_url.clone())?;

        cache.upsert(Actor::local(&config, "john"))?;
        let john = cache.resolve_by_id("https://social.example.com/users/john")?;
        assert!(john.is_local());
        assert_eq!(john.inbox_url(), "https://social.example.com/users/john/inbox");

        assert!(matches!(
            cache.resolve_by_id("https://remote.example/users/alice"),
            Err(Error::ActorNotResolvable(id)) if id == "https://remote.example/users/alice"
        ));
        Ok(())
    }

    #[test]
    fn locality_follows_base_url() -> Result<()> {
        let tmp_dir = tempdir()?;
        let keyspace = Config::new(tmp_dir.path()).temporary(true).open()?;
        let cache = ActorCache::new(keyspace, "https://social.example.com")?;

        // Stored as local under a different base url.
        let other = ActivityPubConfig {
            base_url: "https://social.example.com.evil".to_string(),
        };
        cache.upsert(Actor::local(&other, "mallory"))?;
        let mallory = cache.resolve_by_id("https://social.example.com.evil/users/mallory")?;
        assert!(!mallory.is_local());
        Ok(())
    }

    #[test]
    fn over_long_id_is_a_storage_error() -> Result<()> {
        let tmp_dir = tempdir()?;
        let keyspace = Config::new(tmp_dir.path()).temporary(true).open()?;
        let config = ActivityPubConfig {
            base_url: "https://social.example.com".to_string(),
        };
        let cache = ActorCache::new(keyspace, config.base_url.clone())?;

        let actor = Actor::local(&config, &"a".repeat(70_000));
        assert!(matches!(cache.upsert(actor.clone()), Err(Error::Storage(_))));
        assert!(matches!(cache.resolve_by_id(actor.id()), Err(Error::Storage(_))));
        Ok(())
    }
}
