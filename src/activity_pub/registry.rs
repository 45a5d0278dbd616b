use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::model::{ActivityKind, ActivityNode, ActivityType};

/// Legal protocol type tags, shared by the decoder and the dispatcher.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<&'static str, ActivityType>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        let types = ActivityType::ALL
            .into_iter()
            .map(|ty| (ty.as_str(), ty))
            .collect();
        TypeRegistry { types }
    }

    pub fn type_of(&self, tag: &str) -> Result<ActivityType> {
        self.types
            .get(tag)
            .copied()
            .ok_or_else(|| Error::UnknownType(tag.to_string()))
    }

    /// A fresh, empty node of the variant registered for `tag`.
    pub fn resolve(&self, tag: &str) -> Result<ActivityNode> {
        let ty = self.type_of(tag)?;
        Ok(self.create(ty))
    }

    pub fn create(&self, ty: ActivityType) -> ActivityNode {
        ActivityNode::new(ActivityKind::empty(ty))
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn types(&self) -> impl Iterator<Item = ActivityType> + '_ {
        self.types.values().copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
