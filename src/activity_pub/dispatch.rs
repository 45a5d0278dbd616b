//! Routing of decoded nodes to the handler owning their type.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

use super::model::{ActivityGraph, ActivityType, NodeRef};
use super::registry::TypeRegistry;

/// Capabilities every type handler exposes.
///
/// A handler only overrides what is meaningful for its type, the rest are
/// no-ops.
pub trait Handler: Send + Sync {
    /// Validate and apply a freshly received top level activity.
    fn process_incoming_request(&self, _dispatch: &DispatchRegistry, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }

    /// React to `node` being the object of `wrapper`.
    fn activity(&self, _wrapper: NodeRef<'_>, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }

    fn get_item_by_id(&self, id: &str) -> Result<ActivityGraph> {
        Err(Error::ItemNotFound(id.to_string()))
    }

    fn save(&self, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }
}

/// Immutable binding of every registered type to exactly one handler.
#[derive(Clone)]
pub struct DispatchRegistry {
    types: Arc<TypeRegistry>,
    handlers: BTreeMap<ActivityType, Arc<dyn Handler>>,
}

pub struct DispatchRegistryBuilder {
    types: Arc<TypeRegistry>,
    handlers: BTreeMap<ActivityType, Arc<dyn Handler>>,
}

impl DispatchRegistry {
    pub fn builder(types: Arc<TypeRegistry>) -> DispatchRegistryBuilder {
        DispatchRegistryBuilder {
            types,
            handlers: BTreeMap::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn handler_for(&self, node: NodeRef<'_>) -> Result<&dyn Handler> {
        self.handler_for_activity_type(node.activity_type())
    }

    /// Lookup straight from a protocol tag, before any node exists.
    pub fn handler_for_type(&self, tag: &str) -> Result<&dyn Handler> {
        let ty = self.types.type_of(tag)?;
        self.handler_for_activity_type(ty)
    }

    fn handler_for_activity_type(&self, ty: ActivityType) -> Result<&dyn Handler> {
        self.handlers
            .get(&ty)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| Error::UnknownType(ty.as_str().to_string()))
    }
}

impl DispatchRegistryBuilder {
    /// Binds `ty` to `handler`. A later binding replaces an earlier one.
    pub fn bind(mut self, ty: ActivityType, handler: Arc<dyn Handler>) -> DispatchRegistryBuilder {
        self.handlers.insert(ty, handler);
        self
    }

    pub fn bind_all(
        mut self,
        types: impl IntoIterator<Item = ActivityType>,
        handler: Arc<dyn Handler>,
    ) -> DispatchRegistryBuilder {
        for ty in types {
            self.handlers.insert(ty, handler.clone());
        }
        self
    }

    /// Fails with `UnknownType` naming the first registered type that has no
    /// handler.
    pub fn build(self) -> Result<DispatchRegistry> {
        if let Some(unbound) = self.types.types().find(|ty| !self.handlers.contains_key(ty)) {
            return Err(Error::UnknownType(unbound.as_str().to_string()));
        }
        debug!(target: "apub", handlers = self.handlers.len(), "dispatch registry ready");
        Ok(DispatchRegistry {
            types: self.types,
            handlers: self.handlers,
        })
    }
}
