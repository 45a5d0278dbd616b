//! Turns untrusted JSON activity documents into typed graphs.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::model::{ActivityGraph, ActivityNode, NodeId, RawObject, Slot};
use super::registry::TypeRegistry;

/// Deepest nesting level accepted. The root is level 1.
pub const REDUNDANCY_LIMIT: usize = 10;

/// Longest `id`, `actor` or `object` IRI accepted. These become store keys.
pub const MAX_IRI_LENGTH: usize = 4096;

/// Type tag used when a node carries none. Never registered.
const EMPTY_TYPE: &str = "";

/// Supplies the address of this server.
pub trait CloudAddress: Send + Sync {
    fn current_address(&self) -> String;
}

impl CloudAddress for String {
    fn current_address(&self) -> String {
        self.clone()
    }
}

#[derive(Clone)]
pub struct ActivityDecoder {
    types: Arc<TypeRegistry>,
    cloud: Arc<dyn CloudAddress>,
}

impl ActivityDecoder {
    pub fn new(types: Arc<TypeRegistry>, cloud: Arc<dyn CloudAddress>) -> ActivityDecoder {
        ActivityDecoder { types, cloud }
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn cloud(&self) -> &Arc<dyn CloudAddress> {
        &self.cloud
    }

    /// Decode a whole document.
    ///
    /// An unknown root type fails the call. Nested `object` and `icon` nodes
    /// with an unknown type are dropped. Exceeding [`REDUNDANCY_LIMIT`] or
    /// [`MAX_IRI_LENGTH`] anywhere fails the call.
    pub fn decode(&self, raw: &Value) -> Result<ActivityGraph> {
        let raw = RawObject::from_value(raw);
        let root = self.decode_node(raw, 1)?;
        let mut graph = ActivityGraph::new(root);
        self.decode_children(&mut graph, NodeId::ROOT, raw, 1)?;
        debug!(
            target: "apub",
            id = graph.root().id(),
            kind = %graph.root().activity_type(),
            nodes = graph.len(),
            "decoded activity"
        );
        Ok(graph)
    }

    /// Re-decode a node from its retained source.
    pub(crate) fn decode_str(&self, text: &str) -> Result<ActivityGraph> {
        let value: Value = serde_json::from_str(text)
            .map_err(|error| Error::Storage(anyhow::Error::new(error)))?;
        self.decode(&value)
    }

    fn decode_node(&self, raw: RawObject<'_>, level: usize) -> Result<ActivityNode> {
        if level > REDUNDANCY_LIMIT {
            warn!(target: "apub", level, "refusing to decode deeply nested activity");
            return Err(Error::RedundancyLimitExceeded(level));
        }
        let tag = raw.first_type().unwrap_or(EMPTY_TYPE);
        let mut node = self.types.resolve(tag)?;
        node.url_cloud = self.cloud.current_address();
        node.id = raw.id().unwrap_or_default().to_string();
        node.actor_id = raw.get_node_iri("actor").unwrap_or_default().to_string();
        node.kind.import(&raw);
        check_iri_length("id", &node.id)?;
        check_iri_length("actor", &node.actor_id)?;
        if let Some(activity) = node.kind.as_activity() {
            check_iri_length("object", &activity.object_id)?;
        }
        node.source = Value::Object(raw.map().clone());
        Ok(node)
    }

    fn decode_children(
        &self,
        graph: &mut ActivityGraph,
        parent: NodeId,
        raw: RawObject<'_>,
        level: usize,
    ) -> Result<()> {
        for (prop, slot) in [("object", Slot::Object), ("icon", Slot::Icon)] {
            let Some(child_raw) = raw.get_node_object(prop) else {
                continue;
            };
            match self.decode_node(child_raw, level + 1) {
                Ok(child) => {
                    let child_id = graph.push_child(parent, slot, child);
                    self.decode_children(graph, child_id, child_raw, level + 1)?;
                }
                Err(Error::UnknownType(tag)) => {
                    debug!(target: "apub", prop, %tag, "ignoring nested node of unknown type");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }
}

fn check_iri_length(prop: &'static str, iri: &str) -> Result<()> {
    if iri.len() > MAX_IRI_LENGTH {
        warn!(target: "apub", prop, len = iri.len(), "refusing over-long IRI");
        return Err(Error::IriTooLong {
            prop,
            len: iri.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use serde_json::{Value, json};

    use crate::activity_pub::model::{ActivityKind, ActivityType};
    use crate::activity_pub::registry::TypeRegistry;
    use crate::error::Error;

    use super::{ActivityDecoder, MAX_IRI_LENGTH, REDUNDANCY_LIMIT};

    fn decoder() -> ActivityDecoder {
        ActivityDecoder::new(
            Arc::new(TypeRegistry::new()),
            Arc::new("https://local.example".to_string()),
        )
    }

    /// `levels` nodes chained through their `object` property.
    fn nested_notes(levels: usize) -> Value {
        let mut value = json!({ "type": "Note", "id": format!("https://remote.example/{levels}") });
        for level in (1..levels).rev() {
            value = json!({
                "type": "Create",
                "id": format!("https://remote.example/{level}"),
                "object": value,
            });
        }
        value
    }

    /// `levels` nodes chained through `icon`, or alternating `object` and
    /// `icon` when `mixed` is set.
    fn nested_icons(levels: usize, mixed: bool) -> Value {
        let mut value = json!({ "type": "Image", "id": format!("https://remote.example/{levels}") });
        for level in (1..levels).rev() {
            let prop = if mixed && level % 2 == 0 { "object" } else { "icon" };
            let mut parent = json!({ "type": "Create", "id": format!("https://remote.example/{level}") });
            parent[prop] = value;
            value = parent;
        }
        value
    }

    #[test]
    fn every_registered_type_decodes_without_children() -> Result<()> {
        let decoder = decoder();
        for ty in ActivityType::ALL {
            let graph = decoder.decode(&json!({ "type": ty.as_str() }))?;
            assert_eq!(graph.root().activity_type(), ty);
            assert!(graph.root().object().is_none());
            assert!(graph.root().icon().is_none());
            assert_eq!(graph.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn stamps_cloud_address_and_source() -> Result<()> {
        let raw = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://remote.example/follow/1",
            "type": "Follow",
            "actor": "https://remote.example/users/alice",
            "object": "https://local.example/users/bob",
        });
        let graph = decoder().decode(&raw)?;
        let root = graph.root();
        assert_eq!(root.node().url_cloud, "https://local.example");
        assert_eq!(root.node().source, raw);
        assert_eq!(root.id(), "https://remote.example/follow/1");
        assert_eq!(root.actor_id(), "https://remote.example/users/alice");
        assert_eq!(root.object_id(), "https://local.example/users/bob");
        assert!(root.object().is_none());
        assert!(!root.is_local());
        Ok(())
    }

    #[test]
    fn source_re_decodes_to_same_node() -> Result<()> {
        let decoder = decoder();
        let graph = decoder.decode(&json!({
            "id": "https://remote.example/notes/1",
            "type": "Note",
            "content": "<p>hi</p>",
            "icon": { "type": "Image", "url": "https://remote.example/a.png" },
        }))?;
        let again = decoder.decode_str(&graph.root().source())?;
        assert_eq!(again.root().node(), graph.root().node());
        Ok(())
    }

    #[test]
    fn nesting_up_to_the_limit_links_parents() -> Result<()> {
        let graph = decoder().decode(&nested_notes(REDUNDANCY_LIMIT))?;
        assert_eq!(graph.len(), REDUNDANCY_LIMIT);
        let mut node = graph.root();
        let mut depth = 1;
        while let Some(child) = node.object() {
            assert_eq!(child.parent().map(|p| p.id()), Some(node.id()));
            node = child;
            depth += 1;
        }
        assert_eq!(depth, REDUNDANCY_LIMIT);
        assert_eq!(node.depth(), REDUNDANCY_LIMIT);
        assert!(matches!(node.kind(), ActivityKind::Note(_)));
        Ok(())
    }

    #[test]
    fn nesting_past_the_limit_fails() {
        for levels in [REDUNDANCY_LIMIT + 1, REDUNDANCY_LIMIT + 5, 500] {
            assert!(matches!(
                decoder().decode(&nested_notes(levels)),
                Err(Error::RedundancyLimitExceeded(level)) if level == REDUNDANCY_LIMIT + 1
            ));
        }
    }

    #[test]
    fn redundancy_limit_is_not_swallowed_for_unknown_deep_types() {
        let mut value = json!({ "type": "Unheard" });
        for _ in 0..REDUNDANCY_LIMIT {
            value = json!({ "type": "Undo", "object": value });
        }
        assert!(matches!(
            decoder().decode(&value),
            Err(Error::RedundancyLimitExceeded(_))
        ));
    }

    #[test]
    fn unknown_nested_type_leaves_object_unset() -> Result<()> {
        let graph = decoder().decode(&json!({
            "type": "Create",
            "id": "https://remote.example/create/1",
            "object": { "type": "Question", "id": "https://remote.example/q/1" },
            "icon": { "type": "Image", "url": "https://remote.example/i.png" },
        }))?;
        let root = graph.root();
        assert!(root.object().is_none());
        assert_eq!(root.object_id(), "https://remote.example/q/1");
        let icon = root.icon().expect("icon still decoded");
        assert!(icon.type_is(ActivityType::Image));
        assert_eq!(icon.parent().map(|p| p.id()), Some(root.id()));
        Ok(())
    }

    #[test]
    fn unknown_or_missing_root_type_fails() {
        let decoder = decoder();
        assert!(matches!(
            decoder.decode(&json!({ "type": "Question", "object": { "type": "Note" } })),
            Err(Error::UnknownType(tag)) if tag == "Question"
        ));
        assert!(matches!(
            decoder.decode(&json!({ "id": "https://remote.example/x" })),
            Err(Error::UnknownType(tag)) if tag.is_empty()
        ));
        assert!(matches!(
            decoder.decode(&json!(["not", "an", "object"])),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn untyped_nested_object_is_tolerated() -> Result<()> {
        let graph = decoder().decode(&json!({
            "type": "Like",
            "object": { "id": "https://remote.example/notes/1" },
        }))?;
        assert!(graph.root().object().is_none());
        assert_eq!(graph.root().object_id(), "https://remote.example/notes/1");
        Ok(())
    }

    #[test]
    fn icon_chain_shares_the_depth_limit() -> Result<()> {
        let graph = decoder().decode(&nested_icons(REDUNDANCY_LIMIT, false))?;
        assert_eq!(graph.len(), REDUNDANCY_LIMIT);
        for mixed in [false, true] {
            assert!(matches!(
                decoder().decode(&nested_icons(REDUNDANCY_LIMIT + 1, mixed)),
                Err(Error::RedundancyLimitExceeded(level)) if level == REDUNDANCY_LIMIT + 1
            ));
        }
        Ok(())
    }

    #[test]
    fn mixed_chain_up_to_the_limit_decodes() -> Result<()> {
        let graph = decoder().decode(&nested_icons(REDUNDANCY_LIMIT, true))?;
        assert_eq!(graph.len(), REDUNDANCY_LIMIT);
        let root = graph.root();
        assert!(root.icon().is_some());
        assert!(root.object().is_none());
        Ok(())
    }

    #[test]
    fn unknown_icon_at_depth_is_dropped() -> Result<()> {
        let mut value = json!({ "type": "Emoji", "id": "https://remote.example/emoji" });
        for level in (1..REDUNDANCY_LIMIT + 1).rev() {
            value = json!({
                "type": "Image",
                "id": format!("https://remote.example/{level}"),
                "icon": value,
            });
        }
        // The unknown icon sits past the limit, which still fails the call.
        assert!(matches!(
            decoder().decode(&value),
            Err(Error::RedundancyLimitExceeded(_))
        ));

        let Value::Object(map) = &mut value else {
            panic!("expected an object");
        };
        let inner = map.remove("icon").expect("chained icon");
        let graph = decoder().decode(&inner)?;
        assert_eq!(graph.len(), REDUNDANCY_LIMIT - 1);
        let mut node = graph.root();
        while let Some(icon) = node.icon() {
            node = icon;
        }
        assert_eq!(node.id(), format!("https://remote.example/{REDUNDANCY_LIMIT}"));
        assert_eq!(node.depth(), REDUNDANCY_LIMIT - 1);
        Ok(())
    }

    #[test]
    fn over_long_iris_are_refused() {
        let long = format!("https://remote.example/users/{}", "a".repeat(70_000));
        let long = long.as_str();
        for raw in [
            json!({ "type": "Person", "id": long, "inbox": "https://remote.example/inbox" }),
            json!({ "type": "Follow", "actor": long, "object": "https://local.example/users/bob" }),
            json!({ "type": "Follow", "actor": "https://remote.example/users/alice", "object": long }),
            json!({ "type": "Undo", "object": { "type": "Follow", "actor": long } }),
        ] {
            assert!(matches!(
                decoder().decode(&raw),
                Err(Error::IriTooLong { len, .. }) if len > MAX_IRI_LENGTH
            ));
        }
        let at_limit = "a".repeat(MAX_IRI_LENGTH);
        assert!(decoder().decode(&json!({ "type": "Note", "id": at_limit })).is_ok());
    }
}
