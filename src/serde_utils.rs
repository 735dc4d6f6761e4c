//! Reference-preserving entity graph serialization.

use std::collections::{BTreeMap, HashMap};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::{Entity, Id};

// =============================================================================
// Reference-preserving graphs
// =============================================================================
//
// Wire format:
//   first occurrence  {"$id": "1", "$type": "Car", ...fields, ...links}
//   later occurrence  {"$ref": "1"}
//   to-many link      {"$values": [ ... ]}

const ID_KEY: &str = "$id";
const REF_KEY: &str = "$ref";
const TYPE_KEY: &str = "$type";
const VALUES_KEY: &str = "$values";

/// Index of a node inside an [`EntityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    One(NodeId),
    Many(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub kind: String,
    pub fields: Map<String, Value>,
    pub links: BTreeMap<String, Link>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Reference '{0}' does not match any $id")]
    UnresolvedReference(String),

    #[error("Duplicate $id '{0}'")]
    DuplicateId(String),

    #[error("Expected an object with $id or $ref, found {0}")]
    NotANode(String),

    #[error("Graph has no root node")]
    Empty,
}

/// Object graph whose nodes may reference each other, including cycles.
///
/// Nodes live in an arena and refer to each other by index, so a cycle such
/// as driver → car → drivers → driver is just a pair of indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityGraph {
    nodes: Vec<GraphNode>,
    keys: HashMap<(String, Id), NodeId>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, or return the existing node for the same kind and id.
    pub fn insert<T: Entity + Serialize>(&mut self, entity: &T) -> NodeId {
        let key = entity.id().map(|id| (T::NAME.to_string(), id));
        if let Some(existing) = key.as_ref().and_then(|k| self.keys.get(k)) {
            return *existing;
        }

        let fields = match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let node = self.push(GraphNode {
            kind: T::NAME.to_string(),
            fields,
            links: BTreeMap::new(),
        });
        if let Some(key) = key {
            self.keys.insert(key, node);
        }
        node
    }

    /// Point `from.name` at a single node.
    pub fn link_one(&mut self, from: NodeId, name: &str, to: NodeId) {
        self.nodes[from.0]
            .links
            .insert(name.to_string(), Link::One(to));
    }

    /// Append `to` to the to-many link `from.name`, skipping duplicates.
    pub fn link_many(&mut self, from: NodeId, name: &str, to: NodeId) {
        let entry = self.nodes[from.0]
            .links
            .entry(name.to_string())
            .or_insert_with(|| Link::Many(Vec::new()));
        if let Link::One(_) = entry {
            *entry = Link::Many(Vec::new());
        }
        if let Link::Many(targets) = entry {
            if !targets.contains(&to) {
                targets.push(to);
            }
        }
    }

    /// Ensure an (initially empty) to-many link exists.
    pub fn declare_many(&mut self, from: NodeId, name: &str) {
        self.nodes[from.0]
            .links
            .entry(name.to_string())
            .or_insert_with(|| Link::Many(Vec::new()));
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    /// The first node inserted; serialization starts here.
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Target of a to-one link.
    pub fn one(&self, from: NodeId, name: &str) -> Option<NodeId> {
        match self.nodes[from.0].links.get(name) {
            Some(Link::One(to)) => Some(*to),
            _ => None,
        }
    }

    /// Targets of a to-many link.
    pub fn many(&self, from: NodeId, name: &str) -> &[NodeId] {
        match self.nodes[from.0].links.get(name) {
            Some(Link::Many(to)) => to,
            _ => &[],
        }
    }

    fn push(&mut self, node: GraphNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Encode as JSON, emitting each node once and `$ref` for repeats.
    pub fn to_json(&self) -> Value {
        match self.root() {
            Some(root) => {
                let mut assigned = HashMap::new();
                self.encode(root, &mut assigned)
            }
            None => Value::Null,
        }
    }

    fn encode(&self, id: NodeId, assigned: &mut HashMap<NodeId, String>) -> Value {
        if let Some(existing) = assigned.get(&id) {
            let mut reference = Map::new();
            reference.insert(REF_KEY.to_string(), Value::String(existing.clone()));
            return Value::Object(reference);
        }
        let label = (assigned.len() + 1).to_string();
        assigned.insert(id, label.clone());

        let node = &self.nodes[id.0];
        let mut out = Map::new();
        out.insert(ID_KEY.to_string(), Value::String(label));
        out.insert(TYPE_KEY.to_string(), Value::String(node.kind.clone()));
        for (key, value) in &node.fields {
            out.insert(key.clone(), value.clone());
        }
        for (name, link) in &node.links {
            let encoded = match link {
                Link::One(to) => self.encode(*to, assigned),
                Link::Many(targets) => {
                    let values = targets.iter().map(|t| self.encode(*t, assigned)).collect();
                    let mut wrapper = Map::new();
                    wrapper.insert(VALUES_KEY.to_string(), Value::Array(values));
                    Value::Object(wrapper)
                }
            };
            out.insert(name.clone(), encoded);
        }
        Value::Object(out)
    }

    /// Decode JSON produced by [`EntityGraph::to_json`] or any other writer
    /// of the same format.
    ///
    /// Every `$ref` resolves to the node that carried the matching `$id`, so
    /// repeated references share one node. A `$ref` may appear before its
    /// `$id` in the document: every `$id` is registered first, then links are
    /// resolved.
    pub fn from_json(value: &Value) -> Result<Self, GraphError> {
        if value.is_null() {
            return Err(GraphError::Empty);
        }
        let mut graph = EntityGraph::new();
        let mut labels = HashMap::new();
        graph.register(value, &mut labels)?;
        graph.resolve(value, &labels)?;
        Ok(graph)
    }

    /// Allocate a node for every `$id` in the document, root first.
    fn register(
        &mut self,
        value: &Value,
        labels: &mut HashMap<String, NodeId>,
    ) -> Result<(), GraphError> {
        let Some(object) = value.as_object() else {
            return Err(GraphError::NotANode(value.to_string()));
        };
        if object.contains_key(REF_KEY) {
            return Ok(());
        }

        let label = object
            .get(ID_KEY)
            .map(label_of)
            .ok_or_else(|| GraphError::NotANode(value.to_string()))?;
        if labels.contains_key(&label) {
            return Err(GraphError::DuplicateId(label));
        }
        let kind = object
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = self.push(GraphNode {
            kind,
            fields: Map::new(),
            links: BTreeMap::new(),
        });
        labels.insert(label, id);

        for (key, child) in object {
            if key.starts_with('$') {
                continue;
            }
            match Member::of(child) {
                Member::One(node) => self.register(node, labels)?,
                Member::Many(items) => {
                    for item in items {
                        self.register(item, labels)?;
                    }
                }
                Member::Field => {}
            }
        }
        Ok(())
    }

    /// Fill in fields and links of the node registered for `value`.
    fn resolve(
        &mut self,
        value: &Value,
        labels: &HashMap<String, NodeId>,
    ) -> Result<NodeId, GraphError> {
        let Some(object) = value.as_object() else {
            return Err(GraphError::NotANode(value.to_string()));
        };

        if let Some(reference) = object.get(REF_KEY) {
            let label = label_of(reference);
            return labels
                .get(&label)
                .copied()
                .ok_or(GraphError::UnresolvedReference(label));
        }

        let label = object
            .get(ID_KEY)
            .map(label_of)
            .ok_or_else(|| GraphError::NotANode(value.to_string()))?;
        let id = labels
            .get(&label)
            .copied()
            .ok_or(GraphError::UnresolvedReference(label))?;

        let mut fields = Map::new();
        let mut links = BTreeMap::new();
        for (key, child) in object {
            if key.starts_with('$') {
                continue;
            }
            match Member::of(child) {
                Member::One(node) => {
                    links.insert(key.clone(), Link::One(self.resolve(node, labels)?));
                }
                Member::Many(items) => {
                    let targets = items
                        .iter()
                        .map(|item| self.resolve(item, labels))
                        .collect::<Result<Vec<_>, _>>()?;
                    links.insert(key.clone(), Link::Many(targets));
                }
                Member::Field => {
                    fields.insert(key.clone(), child.clone());
                }
            }
        }

        let node = &mut self.nodes[id.0];
        if let Some(entity_id) = fields.get("id").and_then(Value::as_i64) {
            self.keys.insert((node.kind.clone(), entity_id), id);
        }
        node.fields = fields;
        node.links = links;
        Ok(id)
    }
}

/// What a non-`$` member of a node object holds.
enum Member<'a> {
    One(&'a Value),
    Many(&'a [Value]),
    Field,
}

impl<'a> Member<'a> {
    fn of(value: &'a Value) -> Self {
        if is_node(value) {
            return Member::One(value);
        }
        match value
            .as_object()
            .filter(|o| o.len() == 1)
            .and_then(|o| o.get(VALUES_KEY))
            .and_then(Value::as_array)
        {
            Some(items) => Member::Many(items),
            None => Member::Field,
        }
    }
}

fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_node(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key(ID_KEY) || o.contains_key(REF_KEY))
}

impl Serialize for EntityGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntityGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        EntityGraph::from_json(&value).map_err(D::Error::custom)
    }
}
