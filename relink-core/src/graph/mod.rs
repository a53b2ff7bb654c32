//! Resource Graph
//!
//! This module holds the in-memory side of the codec: typed nodes linked
//! directly to each other, and the cycle-safe algorithms that run over them.
//!
//! # Overview
//!
//! - [`ResourceKey`] and [`KeyTable`] resolve identity, treating
//!   `(type, id)` and `(type, id, local_id)` as the same resource.
//! - [`Node`] is a shared handle to one entity. Relationships point at other
//!   handles, so shared targets and cycles are real sharing, never copies.
//! - [`NodeVariant`] attaches per-type behaviour to nodes.
//! - [`GraphWalker`] visits each reachable node once, by instance identity.
//! - [`equal`] and [`compare`] check structural equality across cycles.
//! - [`apply_defaults`] fills in variant defaults across a whole graph.
//!
//! Every traversal keeps a visited set, so all of them run in time linear in
//! the number of unique nodes plus relationship edges.

mod defaults;
mod equivalence;
mod key;
mod node;
mod variant;
mod walker;

pub use defaults::{apply_defaults, apply_defaults_to_all, apply_to_node};
pub use equivalence::{compare, equal, Comparison};
pub use key::{KeyTable, ResourceKey};
pub use node::{
    Attributes, Field, Node, NodeBuilder, NodeIdentity, Relationship, Relationships,
};
pub use variant::{GenericVariant, NodeVariant, TaggedVariant, VariantExt};
pub use walker::{walk, GraphWalker};
