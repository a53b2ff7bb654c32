//! Resource Keys
//!
//! A resource is identified by its type tag plus an `id`, a `local_id`, or
//! both. Once a persistent `id` exists the `local_id` no longer takes part in
//! identity, so `(quote, q1, LID-1)` and `(quote, q1, -)` name the same
//! resource. [`ResourceKey`] compares and hashes on that canonical form and
//! [`KeyTable`] stores nodes under it.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use super::node::Node;

/// Identity of a resource: `(type, id, local_id)`.
#[derive(Debug, Clone, Eq)]
pub struct ResourceKey {
    type_tag: String,
    id: Option<String>,
    local_id: Option<String>,
}

impl ResourceKey {
    /// Create a key from its three parts.
    pub fn new(
        type_tag: impl Into<String>,
        id: Option<String>,
        local_id: Option<String>,
    ) -> Self {
        Self {
            type_tag: type_tag.into(),
            id,
            local_id,
        }
    }

    /// The type tag.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// The persistent id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The local id, if any.
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// The local id that still participates in identity.
    ///
    /// This is `None` whenever an `id` is present.
    fn identity_local_id(&self) -> Option<&str> {
        if self.id.is_some() {
            None
        } else {
            self.local_id.as_deref()
        }
    }

    /// Reduce the key to its canonical form, dropping the local id once an id
    /// exists.
    pub fn canonical(&self) -> Self {
        Self {
            type_tag: self.type_tag.clone(),
            id: self.id.clone(),
            local_id: self.identity_local_id().map(str::to_owned),
        }
    }

    /// Whether this key is already canonical.
    pub fn is_canonical(&self) -> bool {
        self.id.is_none() || self.local_id.is_none()
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_tag == other.type_tag
            && self.id == other.id
            && self.identity_local_id() == other.identity_local_id()
    }
}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag.hash(state);
        self.id.hash(state);
        self.identity_local_id().hash(state);
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.type_tag,
            self.id.as_deref().unwrap_or("-"),
            self.local_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Lookup table from [`ResourceKey`] to [`Node`].
///
/// Keys are stored canonically, so a lookup by `(type, id, local_id)` finds an
/// entry stored under `(type, id, -)` and vice versa. Iteration follows
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: IndexMap<ResourceKey, Node>,
}

impl KeyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` under the canonical form of `key`.
    ///
    /// Returns the node previously stored under the same canonical key.
    pub fn insert(&mut self, key: &ResourceKey, node: Node) -> Option<Node> {
        self.entries.insert(key.canonical(), node)
    }

    /// Store `node` only if no entry exists for `key` yet.
    ///
    /// Returns the node that ends up stored under the key.
    pub fn get_or_insert_with(&mut self, key: &ResourceKey, make: impl FnOnce() -> Node) -> &Node {
        self.entries.entry(key.canonical()).or_insert_with(make)
    }

    /// Fetch the node stored under `key`.
    pub fn get(&self, key: &ResourceKey) -> Option<&Node> {
        self.entries.get(key)
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over stored canonical keys.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.keys()
    }

    /// Iterate over `(canonical key, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &Node)> {
        self.entries.iter()
    }

    /// Build a table holding the entries of `self` followed by those of
    /// `other`. Entries of `other` replace entries of `self` that share a key.
    pub fn union(&self, other: &KeyTable) -> KeyTable {
        let mut merged = self.clone();
        merged.extend(other.iter().map(|(key, node)| (key.clone(), node.clone())));
        merged
    }
}

impl Extend<(ResourceKey, Node)> for KeyTable {
    fn extend<I: IntoIterator<Item = (ResourceKey, Node)>>(&mut self, iter: I) {
        for (key, node) in iter {
            self.insert(&key, node);
        }
    }
}

impl FromIterator<(ResourceKey, Node)> for KeyTable {
    fn from_iter<I: IntoIterator<Item = (ResourceKey, Node)>>(iter: I) -> Self {
        let mut table = KeyTable::new();
        table.extend(iter);
        table
    }
}
