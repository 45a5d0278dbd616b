//! Decoded activity graphs.
//!
//! A graph owns its nodes in an arena. Children are reached through `object`
//! and `icon` indices, the `parent` index is a plain back-reference and is only
//! walked to find the root when verifying origins.

use reqwest::Url;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

use super::kind::{ActivityKind, ActivityType};

const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityNode {
    pub id: String,
    pub actor_id: String,
    pub kind: ActivityKind,
    /// Address of the server that materialized this node.
    pub url_cloud: String,
    /// The JSON this node was decoded from, kept for re-delivery and audit.
    pub source: Value,
    parent: Option<NodeId>,
    object: Option<NodeId>,
    icon: Option<NodeId>,
}

impl ActivityNode {
    pub fn new(kind: ActivityKind) -> ActivityNode {
        ActivityNode {
            id: String::new(),
            actor_id: String::new(),
            kind,
            url_cloud: String::new(),
            source: Value::Null,
            parent: None,
            object: None,
            icon: None,
        }
    }
    pub fn activity_type(&self) -> ActivityType {
        self.kind.activity_type()
    }
    /// Points the activity at `iri` without embedding the object.
    pub fn set_object_id(&mut self, iri: impl Into<String>) {
        if let Some(activity) = self.kind.as_activity_mut() {
            activity.object_id = iri.into();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Object,
    Icon,
}

#[derive(Debug, Clone)]
pub struct ActivityGraph {
    nodes: Vec<ActivityNode>,
    origin: Option<String>,
}

impl ActivityGraph {
    pub fn new(root: ActivityNode) -> ActivityGraph {
        let mut root = root;
        root.parent = None;
        root.object = None;
        root.icon = None;
        ActivityGraph {
            nodes: vec![root],
            origin: None,
        }
    }
    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId::ROOT)
    }
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { graph: self, id }
    }
    pub fn root_mut(&mut self) -> &mut ActivityNode {
        &mut self.nodes[0]
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// Host of the authenticated sender of this graph.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
    pub fn set_origin(&mut self, host: &str) {
        self.origin = Some(host.to_ascii_lowercase());
    }
    /// Copies the subtree under `subtree` into this graph as the object of
    /// `parent`, replacing any previous object reference.
    pub fn graft_object(&mut self, parent: NodeId, subtree: NodeRef<'_>) -> NodeId {
        let child = self.graft(parent, subtree);
        let child_id = self.nodes[child.0].id.clone();
        let parent_node = &mut self.nodes[parent.0];
        parent_node.object = Some(child);
        parent_node.set_object_id(child_id);
        child
    }

    fn graft(&mut self, parent: NodeId, subtree: NodeRef<'_>) -> NodeId {
        let mut node = subtree.node().clone();
        node.parent = Some(parent);
        node.object = None;
        node.icon = None;
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if let Some(object) = subtree.object() {
            let child = self.graft(id, object);
            self.nodes[id.0].object = Some(child);
        }
        if let Some(icon) = subtree.icon() {
            let child = self.graft(id, icon);
            self.nodes[id.0].icon = Some(child);
        }
        id
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, slot: Slot, mut node: ActivityNode) -> NodeId {
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.attach(parent, slot, id);
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, slot: Slot, child: NodeId) {
        let parent_node = &mut self.nodes[parent.0];
        match slot {
            Slot::Object => parent_node.object = Some(child),
            Slot::Icon => parent_node.icon = Some(child),
        }
    }
}

/// Borrowed cursor into an [`ActivityGraph`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    graph: &'a ActivityGraph,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn node(&self) -> &'a ActivityNode {
        &self.graph.nodes[self.id.0]
    }
    pub fn node_id(&self) -> NodeId {
        self.id
    }
    pub fn graph(&self) -> &'a ActivityGraph {
        self.graph
    }
    pub fn id(&self) -> &'a str {
        &self.node().id
    }
    pub fn actor_id(&self) -> &'a str {
        &self.node().actor_id
    }
    /// IRI of the object this activity acts upon, empty for non-activities.
    pub fn object_id(&self) -> &'a str {
        self.node()
            .kind
            .as_activity()
            .map(|a| a.object_id.as_str())
            .unwrap_or_default()
    }
    pub fn kind(&self) -> &'a ActivityKind {
        &self.node().kind
    }
    pub fn activity_type(&self) -> ActivityType {
        self.node().activity_type()
    }
    pub fn type_is(&self, ty: ActivityType) -> bool {
        self.activity_type() == ty
    }
    pub fn object(&self) -> Option<NodeRef<'a>> {
        self.node().object.map(|id| self.graph.node(id))
    }
    pub fn icon(&self) -> Option<NodeRef<'a>> {
        self.node().icon.map(|id| self.graph.node(id))
    }
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| self.graph.node(id))
    }
    pub fn root(&self) -> NodeRef<'a> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
    /// Nodes from the root down to this one, inclusive.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = *self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }
    pub fn is_local(&self) -> bool {
        let node = self.node();
        !node.url_cloud.is_empty() && node.id.starts_with(&node.url_cloud)
    }
    pub fn source(&self) -> String {
        self.node().source.to_string()
    }

    /// Verifies that the authenticated sender of the enclosing graph is
    /// allowed to speak for `id`.
    ///
    /// The origin host recorded on the graph must equal the host of `id`.
    pub fn check_origin(&self, id: &str) -> Result<()> {
        let origin = self.root().graph.origin();
        let host = Url::parse(id).ok().and_then(|url| url.host_str().map(str::to_string));
        match (origin, host) {
            (Some(origin), Some(host)) if origin == host => Ok(()),
            (origin, _) => {
                warn!(target: "apub", id, ?origin, "origin does not match");
                Err(Error::InvalidOrigin {
                    id: id.to_string(),
                    origin: origin.map(str::to_string),
                })
            }
        }
    }

    /// Re-serializes this node and its children.
    ///
    /// Starts from the retained source and overlays the core fields so nodes
    /// built locally serialize as well as decoded ones.
    pub fn to_value(&self) -> Value {
        let node = self.node();
        let mut map = match &node.source {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if node.parent.is_none() && !map.contains_key("@context") {
            map.insert(
                "@context".to_string(),
                Value::String(ACTIVITY_STREAMS_CONTEXT.to_string()),
            );
        }
        if !node.id.is_empty() {
            map.insert("id".to_string(), Value::String(node.id.clone()));
        }
        map.insert(
            "type".to_string(),
            Value::String(node.activity_type().as_str().to_string()),
        );
        if !node.actor_id.is_empty() {
            map.insert("actor".to_string(), Value::String(node.actor_id.clone()));
        }
        if let Some(object) = self.object() {
            map.insert("object".to_string(), object.to_value());
        } else if !self.object_id().is_empty() {
            map.insert(
                "object".to_string(),
                Value::String(self.object_id().to_string()),
            );
        }
        if let Some(icon) = self.icon() {
            map.insert("icon".to_string(), icon.to_value());
        }
        Value::Object(map)
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("type", &self.activity_type())
            .finish()
    }
}
