//! Graph Walker
//!
//! Breadth-first traversal over relationship edges that yields every
//! reachable node exactly once, keyed on instance identity. Cycles, self
//! references and diamonds all terminate.
//!
//! A node is yielded *before* its relationships are expanded, so a caller may
//! add relationships to the node it was just handed and the walk will follow
//! them. [`apply_defaults`](super::apply_defaults) relies on this.

use std::collections::{HashMap, VecDeque};

use super::node::{Node, NodeIdentity};

/// Iterator over every node reachable from a set of roots.
///
/// Visit order is breadth-first today, but callers must not depend on it.
pub struct GraphWalker {
    queue: VecDeque<Node>,
    // Visited handles are kept alive so an identity cannot be reused while
    // the walk is in progress.
    seen: HashMap<NodeIdentity, Node>,
    pending: Option<Node>,
}

impl GraphWalker {
    /// Walk from a single root.
    pub fn new(root: &Node) -> Self {
        Self::from_roots([root.clone()])
    }

    /// Walk from several roots. Shared nodes are still visited once.
    pub fn from_roots(roots: impl IntoIterator<Item = Node>) -> Self {
        Self {
            queue: roots.into_iter().collect(),
            seen: HashMap::new(),
            pending: None,
        }
    }

    /// Number of distinct nodes yielded so far.
    pub fn visited(&self) -> usize {
        self.seen.len()
    }

    /// Whether `node` has already been yielded.
    pub fn has_visited(&self, node: &Node) -> bool {
        self.seen.contains_key(&node.identity())
    }

    fn expand(&mut self, node: &Node) {
        for relationship in node.relationships().values() {
            self.queue.extend(relationship.nodes().cloned());
        }
    }
}

impl Iterator for GraphWalker {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if let Some(previous) = self.pending.take() {
            self.expand(&previous);
        }

        while let Some(candidate) = self.queue.pop_front() {
            let identity = candidate.identity();
            if self.seen.contains_key(&identity) {
                continue;
            }
            tracing::trace!(key = %candidate.key(), "visiting node");
            self.seen.insert(identity, candidate.clone());
            self.pending = Some(candidate.clone());
            return Some(candidate);
        }

        None
    }
}

/// Convenience for `GraphWalker::new(root)`.
pub fn walk(root: &Node) -> GraphWalker {
    GraphWalker::new(root)
}
