//! Graph Encoding
//!
//! Flattens a node graph back into a [`Document`].
//!
//! The root becomes the primary record. Every other reachable node that
//! carries more than a bare `(type, id)` pointer, meaning a local id,
//! attributes or relationships, becomes one included record. Includes are
//! deduplicated by `(type, id, local_id)`, so two distinct handles with the
//! same identity collapse into one record.

use std::collections::HashSet;

use super::document::{Document, Entity, OneOrMany, Reference, RelField, WireRelationships};
use crate::error::{Error, Result};
use crate::graph::{GraphWalker, Node, Relationship};

type RawKey = (String, Option<String>, Option<String>);

/// Encode the graph rooted at `root`.
///
/// Fails if any encoded node uses the same key for an attribute and a
/// relationship.
#[tracing::instrument(level = "debug", skip_all, fields(root = %root.key()))]
pub fn encode(root: &Node) -> Result<Document> {
    let primary = entity(root)?;

    let mut seen: HashSet<RawKey> = HashSet::new();
    let mut included = Vec::new();
    for node in GraphWalker::new(root) {
        if node.ptr_eq(root) || !needs_include(&node) {
            continue;
        }
        if seen.insert((node.type_tag(), node.id(), node.local_id())) {
            included.push(entity(&node)?);
        }
    }

    tracing::debug!(included = included.len(), "graph encoded");
    Ok(Document {
        primary: OneOrMany::One(primary),
        included,
    })
}

/// Encode several roots into one document with a list primary payload.
///
/// Each root is encoded on its own; include records are then merged,
/// keeping the first record seen for each `(type, id, local_id)`.
#[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub fn encode_many(roots: &[Node]) -> Result<Document> {
    let mut primary = Vec::with_capacity(roots.len());
    let mut included = Vec::new();
    let mut seen: HashSet<RawKey> = HashSet::new();

    for root in roots {
        let document = encode(root)?;
        primary.extend(document.primary.into_vec());
        for record in document.included {
            let key = (record.type_tag.clone(), record.id.clone(), record.local_id.clone());
            if seen.insert(key) {
                included.push(record);
            }
        }
    }

    tracing::debug!(included = included.len(), "graph list encoded");
    Ok(Document {
        primary: OneOrMany::Many(primary),
        included,
    })
}

/// Whether `node` carries anything a reference alone cannot express.
fn needs_include(node: &Node) -> bool {
    node.local_id().is_some_and(|local_id| !local_id.is_empty())
        || node.has_attributes()
        || node.has_relationships()
}

/// The full record for one node.
pub fn entity(node: &Node) -> Result<Entity> {
    let attributes = node.attributes();
    let relationships = node.relationships();

    let mut common: Vec<&String> = attributes
        .keys()
        .filter(|key| relationships.contains_key(*key))
        .collect();
    if !common.is_empty() {
        common.sort_unstable();
        let keys: Vec<String> = common.iter().map(|key| format!("'{key}'")).collect();
        return Err(Error::content(format!(
            "Key names cannot be common to both `attributes` and `relationships`: [{}]",
            keys.join(", ")
        )));
    }

    let relationships: WireRelationships = relationships
        .iter()
        .map(|(name, relationship)| {
            let field = RelField {
                data: references(relationship),
            };
            (name.clone(), Some(field))
        })
        .collect();

    Ok(Entity {
        type_tag: node.type_tag(),
        id: node.id(),
        local_id: node.local_id(),
        attributes,
        relationships,
    })
}

/// The wire references for one relationship value.
pub fn references(relationship: &Relationship) -> Option<OneOrMany<Reference>> {
    match relationship {
        Relationship::Empty => None,
        Relationship::One(node) => Some(OneOrMany::One(reference(node))),
        Relationship::Many(nodes) => Some(OneOrMany::Many(nodes.iter().map(reference).collect())),
    }
}

/// A pointer to `node`: its id when it has one, otherwise its local id.
pub fn reference(node: &Node) -> Reference {
    match node.id() {
        Some(id) => Reference::new(node.type_tag(), Some(id), None),
        None => Reference::new(node.type_tag(), None, node.local_id()),
    }
}
