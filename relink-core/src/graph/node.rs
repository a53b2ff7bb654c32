//! Graph Nodes
//!
//! This module defines [`Node`], the typed entity that lives in a resource
//! graph, together with the values its relationships can hold.
//!
//! # Sharing
//!
//! A `Node` is a handle. Cloning it is cheap and yields another handle to the
//! same entity, so one node can be held by many parents, and by itself.
//! Mutations through any handle are visible through every other handle.
//!
//! Graph algorithms never hold a node's lock while following its edges: they
//! copy the relationship map out first. A self-referencing node therefore
//! never re-enters its own lock.
//!
//! Reference cycles keep their nodes alive. Call
//! [`Node::clear_relationships`] on one member to release a cycle early.
//!
//! # Attributes and relationships
//!
//! A node keeps two separate maps. The overlay accessors ([`Node::get`],
//! [`Node::set`], [`Node::remove`]) look at both, attributes first. A key
//! present in both maps is only reported when it is read or serialized, not
//! when it is written through the raw mutators.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::equivalence;
use super::key::ResourceKey;
use super::variant::{GenericVariant, NodeVariant};
use crate::error::{Error, Result};

/// Direct, opaque data attached to a node.
pub type Attributes = IndexMap<String, Value>;

/// Named links from a node to other nodes.
pub type Relationships = IndexMap<String, Relationship>;

/// The value of one relationship.
#[derive(Clone, Default)]
pub enum Relationship {
    /// An explicitly empty to-one relationship.
    #[default]
    Empty,
    /// A to-one relationship.
    One(Node),
    /// A to-many relationship. Order is significant; an empty list is kept.
    Many(Vec<Node>),
}

impl Relationship {
    /// Iterate over every target node, in order.
    pub fn nodes(&self) -> std::slice::Iter<'_, Node> {
        match self {
            Relationship::Empty => Default::default(),
            Relationship::One(node) => std::slice::from_ref(node).iter(),
            Relationship::Many(nodes) => nodes.iter(),
        }
    }

    /// Whether this is [`Relationship::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Relationship::Empty)
    }

    /// The target of a to-one relationship.
    pub fn as_one(&self) -> Option<&Node> {
        match self {
            Relationship::One(node) => Some(node),
            _ => None,
        }
    }

    /// The targets of a to-many relationship.
    pub fn as_many(&self) -> Option<&[Node]> {
        match self {
            Relationship::Many(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl From<Node> for Relationship {
    fn from(node: Node) -> Self {
        Relationship::One(node)
    }
}

impl From<Option<Node>> for Relationship {
    fn from(node: Option<Node>) -> Self {
        node.map_or(Relationship::Empty, Relationship::One)
    }
}

impl From<Vec<Node>> for Relationship {
    fn from(nodes: Vec<Node>) -> Self {
        Relationship::Many(nodes)
    }
}

impl fmt::Debug for Relationship {
    // Targets are printed by key only so that cyclic graphs print finitely.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::Empty => f.write_str("Empty"),
            Relationship::One(node) => write!(f, "One({})", node.key()),
            Relationship::Many(nodes) => f
                .debug_list()
                .entries(nodes.iter().map(|node| TargetKey(node.key())))
                .finish(),
        }
    }
}

/// Prints a relationship target as its key.
struct TargetKey(ResourceKey);

impl fmt::Debug for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The value found for a key by the overlay accessors.
#[derive(Debug, Clone)]
pub enum Field {
    /// The key names an attribute.
    Attribute(Value),
    /// The key names a relationship.
    Relationship(Relationship),
}

impl Field {
    /// The attribute value, if this field is an attribute.
    pub fn as_attribute(&self) -> Option<&Value> {
        match self {
            Field::Attribute(value) => Some(value),
            Field::Relationship(_) => None,
        }
    }

    /// The relationship value, if this field is a relationship.
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Field::Relationship(relationship) => Some(relationship),
            Field::Attribute(_) => None,
        }
    }
}

/// Opaque instance identity of a node.
///
/// Two handles have the same identity exactly when they point at the same
/// node. Identities are only meaningful while a handle to the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity(usize);

/// Shared state behind a node handle.
struct NodeData {
    variant: Arc<dyn NodeVariant>,
    type_tag: String,
    id: Option<String>,
    local_id: Option<String>,
    attributes: Attributes,
    relationships: Relationships,
}

/// A typed entity in a resource graph.
#[derive(Clone)]
pub struct Node {
    inner: Arc<RwLock<NodeData>>,
}

impl Node {
    /// Create a generic node with the given type tag and nothing else.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self::from_data(NodeData {
            variant: GenericVariant::shared(),
            type_tag: type_tag.into(),
            id: None,
            local_id: None,
            attributes: Attributes::new(),
            relationships: Relationships::new(),
        })
    }

    /// Start building a node of the given variant.
    pub fn builder(variant: Arc<dyn NodeVariant>) -> NodeBuilder {
        NodeBuilder::new(variant)
    }

    /// Start building a generic node with the given type tag.
    pub fn generic(type_tag: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(GenericVariant::shared()).type_tag(type_tag)
    }

    fn from_data(data: NodeData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    /// The node's variant.
    pub fn variant(&self) -> Arc<dyn NodeVariant> {
        Arc::clone(&self.inner.read().variant)
    }

    /// The node's type tag.
    pub fn type_tag(&self) -> String {
        self.inner.read().type_tag.clone()
    }

    /// The persistent id, if any.
    pub fn id(&self) -> Option<String> {
        self.inner.read().id.clone()
    }

    /// Replace the persistent id.
    pub fn set_id(&self, id: Option<String>) {
        self.inner.write().id = id;
    }

    /// The local id, if any.
    pub fn local_id(&self) -> Option<String> {
        self.inner.read().local_id.clone()
    }

    /// Replace the local id.
    pub fn set_local_id(&self, local_id: Option<String>) {
        self.inner.write().local_id = local_id;
    }

    /// The node's resource key. Both ids are kept; comparisons canonicalize.
    pub fn key(&self) -> ResourceKey {
        let data = self.inner.read();
        ResourceKey::new(data.type_tag.clone(), data.id.clone(), data.local_id.clone())
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The instance identity of this node.
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// A copy of the attribute map.
    pub fn attributes(&self) -> Attributes {
        self.inner.read().attributes.clone()
    }

    /// A copy of the relationship map. Targets are shared, not copied.
    pub fn relationships(&self) -> Relationships {
        self.inner.read().relationships.clone()
    }

    /// Whether the node has at least one attribute.
    pub fn has_attributes(&self) -> bool {
        !self.inner.read().attributes.is_empty()
    }

    /// Whether the node has at least one relationship key.
    pub fn has_relationships(&self) -> bool {
        !self.inner.read().relationships.is_empty()
    }

    /// Read a single attribute.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.inner.read().attributes.get(key).cloned()
    }

    /// Read a single relationship.
    pub fn relationship(&self, key: &str) -> Option<Relationship> {
        self.inner.read().relationships.get(key).cloned()
    }

    /// Write an attribute without checking the relationship map.
    pub fn set_attribute(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().attributes.insert(key.into(), value)
    }

    /// Remove an attribute, if present.
    pub fn remove_attribute(&self, key: &str) -> Option<Value> {
        self.inner.write().attributes.shift_remove(key)
    }

    /// Write a relationship without checking the attribute map.
    pub fn set_relationship(
        &self,
        key: impl Into<String>,
        relationship: impl Into<Relationship>,
    ) -> Option<Relationship> {
        self.inner
            .write()
            .relationships
            .insert(key.into(), relationship.into())
    }

    /// Remove a relationship, if present.
    pub fn remove_relationship(&self, key: &str) -> Option<Relationship> {
        self.inner.write().relationships.shift_remove(key)
    }

    /// Drop every relationship, releasing any cycle this node takes part in.
    pub fn clear_relationships(&self) {
        self.inner.write().relationships.clear();
    }

    /// Mutate the attribute map in place.
    pub fn update_attributes<R>(&self, f: impl FnOnce(&mut Attributes) -> R) -> R {
        f(&mut self.inner.write().attributes)
    }

    /// Mutate the relationship map in place.
    ///
    /// The closure runs with the node locked; it must not call back into this
    /// node.
    pub fn update_relationships<R>(&self, f: impl FnOnce(&mut Relationships) -> R) -> R {
        f(&mut self.inner.write().relationships)
    }

    /// Add every relationship whose key is missing. Existing keys are kept.
    ///
    /// Returns the number of keys added.
    pub fn merge_relationships(&self, relationships: Relationships) -> usize {
        let mut data = self.inner.write();
        let before = data.relationships.len();
        for (key, relationship) in relationships {
            data.relationships.entry(key).or_insert(relationship);
        }
        data.relationships.len() - before
    }

    /// Add every attribute whose key is missing. Existing keys are kept.
    ///
    /// Returns the number of keys added.
    pub fn merge_attributes(&self, attributes: Attributes) -> usize {
        let mut data = self.inner.write();
        let before = data.attributes.len();
        for (key, value) in attributes {
            data.attributes.entry(key).or_insert(value);
        }
        data.attributes.len() - before
    }

    /// Look a key up in the attributes, then the relationships.
    ///
    /// Fails with a content validation error if the key is in both maps, and
    /// with [`Error::NotFound`] if it is in neither.
    pub fn get(&self, key: &str) -> Result<Field> {
        self.find(key)?.ok_or_else(|| Error::NotFound {
            key: key.to_owned(),
        })
    }

    /// Like [`Node::get`], but a missing key is `Ok(None)`.
    pub fn find(&self, key: &str) -> Result<Option<Field>> {
        let data = self.inner.read();
        match (data.attributes.get(key), data.relationships.get(key)) {
            (Some(_), Some(_)) => Err(Error::content(format!(
                "Key `{key}` must not be in both attributes and relationships."
            ))),
            (Some(value), None) => Ok(Some(Field::Attribute(value.clone()))),
            (None, Some(relationship)) => Ok(Some(Field::Relationship(relationship.clone()))),
            (None, None) => Ok(None),
        }
    }

    /// Whether the key is an attribute or a relationship.
    ///
    /// A key in both maps is a content validation error, as with [`Node::get`].
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Write an attribute, refusing keys that are already relationships.
    ///
    /// Returns the attribute value that was replaced.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let key = key.into();
        let mut data = self.inner.write();
        if data.relationships.contains_key(&key) {
            return Err(Error::content(format!(
                "Cannot add `{key}` to attributes, it is already a relationship."
            )));
        }
        Ok(data.attributes.insert(key, value))
    }

    /// Delete an attribute and return its value.
    ///
    /// Relationships cannot be deleted this way: a key that is only a
    /// relationship yields [`Error::Usage`].
    pub fn remove(&self, key: &str) -> Result<Value> {
        let mut data = self.inner.write();
        if let Some(value) = data.attributes.shift_remove(key) {
            return Ok(value);
        }
        if data.relationships.contains_key(key) {
            return Err(Error::Usage(format!(
                "Direct item deletion only available for attributes. \
                 Remove `{key}` through the relationship map instead."
            )));
        }
        Err(Error::NotFound {
            key: key.to_owned(),
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        equivalence::equal(self, other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Snapshot first: printing relationship targets locks those nodes,
        // and one of them may be this node.
        let (variant, type_tag, id, local_id, attributes, relationships) = {
            let data = self.inner.read();
            (
                data.variant.name().to_owned(),
                data.type_tag.clone(),
                data.id.clone(),
                data.local_id.clone(),
                data.attributes.clone(),
                data.relationships.clone(),
            )
        };
        let attributes: BTreeMap<_, _> = attributes.iter().collect();
        let relationships: BTreeMap<_, _> = relationships.iter().collect();
        f.debug_struct("Node")
            .field("variant", &variant)
            .field("type_tag", &type_tag)
            .field("id", &id)
            .field("local_id", &local_id)
            .field("attributes", &attributes)
            .field("relationships", &relationships)
            .finish()
    }
}

/// Builder for [`Node`].
///
/// The type tag comes from the variant when it fixes one; otherwise it must
/// be supplied with [`NodeBuilder::type_tag`].
pub struct NodeBuilder {
    variant: Arc<dyn NodeVariant>,
    type_tag: Option<String>,
    id: Option<String>,
    local_id: Option<String>,
    attributes: Attributes,
    relationships: Relationships,
}

impl NodeBuilder {
    fn new(variant: Arc<dyn NodeVariant>) -> Self {
        Self {
            variant,
            type_tag: None,
            id: None,
            local_id: None,
            attributes: Attributes::new(),
            relationships: Relationships::new(),
        }
    }

    /// Set the type tag. Must match the variant's tag if it fixes one.
    pub fn type_tag(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    /// Set the persistent id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set or clear the persistent id.
    pub fn maybe_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Set the local id.
    pub fn local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    /// Set or clear the local id.
    pub fn maybe_local_id(mut self, local_id: Option<String>) -> Self {
        self.local_id = local_id;
        self
    }

    /// Replace the attribute map.
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Add one attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Replace the supplied relationship map.
    pub fn relationships(mut self, relationships: Relationships) -> Self {
        self.relationships = relationships;
        self
    }

    /// Add one relationship.
    pub fn relationship(mut self, key: impl Into<String>, value: impl Into<Relationship>) -> Self {
        self.relationships.insert(key.into(), value.into());
        self
    }

    /// Build the node.
    ///
    /// The variant's initial relationships are installed first and supplied
    /// relationships are laid over them.
    pub fn build(self) -> Result<Node> {
        let type_tag = match (self.variant.type_tag(), self.type_tag) {
            (Some(fixed), Some(given)) if fixed != given => {
                return Err(Error::Usage(format!(
                    "Cannot override type tag `{fixed}` fixed by variant `{}`.",
                    self.variant.name()
                )));
            }
            (Some(fixed), _) => fixed.to_owned(),
            (None, Some(given)) => given,
            (None, None) => {
                return Err(Error::Usage(
                    "type tag must be supplied at construction or fixed by the variant".into(),
                ));
            }
        };

        let mut relationships = self.variant.initial_relationships();
        relationships.extend(self.relationships);

        Ok(Node::from_data(NodeData {
            variant: self.variant,
            type_tag,
            id: self.id,
            local_id: self.local_id,
            attributes: self.attributes,
            relationships,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::variant::TaggedVariant;
    use serde_json::json;

    #[test]
    fn clones_share_state() {
        let node = Node::new("quote");
        let other = node.clone();
        other.set_attribute("x", json!("y"));

        assert!(node.ptr_eq(&other));
        assert_eq!(node.identity(), other.identity());
        assert_eq!(node.attribute("x"), Some(json!("y")));
    }

    #[test]
    fn distinct_nodes_have_distinct_identities() {
        let a = Node::new("quote");
        let b = Node::new("quote");
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.identity(), b.identity());
        // Structurally they are still equal.
        assert_eq!(a, b);
    }

    #[test]
    fn variant_tag_cannot_be_overridden() {
        let variant = TaggedVariant::new("customer").shared();

        let same = Node::builder(variant.clone()).type_tag("customer").build().unwrap();
        assert_eq!(same.type_tag(), "customer");

        let implied = Node::builder(variant.clone()).build().unwrap();
        assert_eq!(implied.type_tag(), "customer");

        let err = Node::builder(variant).type_tag("foo").build().unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
        assert!(err.to_string().contains("Cannot override type tag `customer`"));
    }

    #[test]
    fn generic_nodes_need_a_tag() {
        let err = Node::builder(GenericVariant::shared()).build().unwrap_err();
        assert!(matches!(err, Error::Usage(_)));

        let node = Node::generic("customer").build().unwrap();
        assert_eq!(node.type_tag(), "customer");
    }

    #[test]
    fn get_checks_attributes_then_relationships() {
        let child = Node::new("customer");
        let node = Node::generic("quote")
            .attribute("x", json!(1))
            .relationship("customer", child.clone())
            .build()
            .unwrap();

        assert_eq!(node.get("x").unwrap().as_attribute(), Some(&json!(1)));
        let rel = node.get("customer").unwrap();
        assert!(rel.as_relationship().unwrap().as_one().unwrap().ptr_eq(&child));
        assert!(matches!(node.get("missing"), Err(Error::NotFound { .. })));
        assert!(node.find("missing").unwrap().is_none());
        assert!(node.contains("x").unwrap());
        assert!(node.contains("customer").unwrap());
        assert!(!node.contains("missing").unwrap());
    }

    #[test]
    fn overlapping_key_is_reported_on_read() {
        let node = Node::new("quote");
        node.set_attribute("hello", json!("world"));
        node.set_relationship("hello", Node::new("greeting"));

        let err = node.get("hello").unwrap_err();
        assert!(err.is_content_validation());
        assert_eq!(
            err.to_string(),
            "Key `hello` must not be in both attributes and relationships."
        );
        assert!(node.contains("hello").unwrap_err().is_content_validation());
    }

    #[test]
    fn set_refuses_relationship_keys() {
        let node = Node::new("quote");
        node.set_relationship("nothing", Node::new("other"));

        let err = node.set("nothing", json!("value")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add `nothing` to attributes, it is already a relationship."
        );
        assert_eq!(node.set("fine", json!(1)).unwrap(), None);
        assert_eq!(node.set("fine", json!(2)).unwrap(), Some(json!(1)));
    }

    #[test]
    fn remove_only_deletes_attributes() {
        let node = Node::new("quote");
        node.set_attribute("x", json!(1));
        node.set_relationship("customer", Relationship::Empty);

        assert_eq!(node.remove("x").unwrap(), json!(1));
        assert!(matches!(node.remove("x"), Err(Error::NotFound { .. })));

        let err = node.remove("customer").unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
        assert!(node.relationship("customer").is_some());
    }

    #[test]
    fn merge_keeps_existing_keys() {
        let existing = Node::new("customer");
        let node = Node::generic("quote")
            .relationship("customer", existing.clone())
            .build()
            .unwrap();

        let mut incoming = Relationships::new();
        incoming.insert("customer".into(), Relationship::One(Node::new("customer")));
        incoming.insert("product".into(), Relationship::Many(Vec::new()));

        assert_eq!(node.merge_relationships(incoming), 1);
        let kept = node.relationship("customer").unwrap();
        assert!(kept.as_one().unwrap().ptr_eq(&existing));
        assert_eq!(node.relationship("product").unwrap().as_many().unwrap().len(), 0);
    }

    #[test]
    fn relationship_iterates_targets() {
        let a = Node::new("item");
        let b = Node::new("item");
        assert_eq!(Relationship::Empty.nodes().count(), 0);
        assert_eq!(Relationship::from(a.clone()).nodes().count(), 1);
        assert_eq!(Relationship::from(vec![a, b]).nodes().count(), 2);
        assert!(Relationship::from(None).is_empty());
    }

    #[test]
    fn debug_output_of_self_loop_is_finite() {
        let node = Node::generic("parent").id("p1").build().unwrap();
        node.set_relationship("me", node.clone());
        let rendered = format!("{node:?}");
        assert!(rendered.contains("One((parent, p1, -))"));
    }
}
