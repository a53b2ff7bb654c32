//! Default Application
//!
//! Fills in missing attributes and relationships across a whole graph using
//! each node's variant. Existing keys are never overwritten, so applying
//! defaults twice is the same as applying them once.
//!
//! Defaults are requested from the variant afresh for every node, so a
//! default relationship that points at a new node, or back at the node
//! itself, is never shared between nodes or between calls.

use super::node::Node;
use super::walker::GraphWalker;

/// Apply variant defaults to `root` and everything reachable from it.
///
/// Relationships added by defaults are walked too, so the defaults of a
/// default child are applied in the same call. Returns the number of
/// distinct nodes visited.
pub fn apply_defaults(root: &Node) -> usize {
    apply_defaults_to_all([root.clone()])
}

/// Apply variant defaults to several roots and everything reachable from
/// them. Returns the number of distinct nodes visited.
pub fn apply_defaults_to_all(roots: impl IntoIterator<Item = Node>) -> usize {
    let mut walker = GraphWalker::from_roots(roots);
    for node in walker.by_ref() {
        apply_to_node(&node);
    }
    let visited = walker.visited();
    tracing::debug!(visited, "applied defaults");
    visited
}

/// Apply defaults to one node without following its relationships.
pub fn apply_to_node(node: &Node) {
    let variant = node.variant();
    // The variant is called without the node locked: defaults may read the
    // node or refer back to it.
    let attributes = variant.default_attributes(node);
    let relationships = variant.default_relationships(node);
    let added_attributes = node.merge_attributes(attributes);
    let added_relationships = node.merge_relationships(relationships);
    tracing::trace!(
        key = %node.key(),
        added_attributes,
        added_relationships,
        "defaults applied to node"
    );
}
