//! Relink Core
//!
//! This crate converts between a flat, reference-based resource document and
//! an in-memory graph of typed nodes whose relationships are direct, shared
//! links. It implements:
//!
//! - Identity resolution across persistent ids and document-local ids
//! - Graph construction with batch referential-integrity checks
//! - Cycle-safe traversal, structural equality and default application
//! - Re-encoding with include deduplication
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: nodes, identity keys and the algorithms that walk them
//! - `factory`: the registry that picks a variant per type tag
//! - `codec`: wire types, document validation, building and encoding
//! - `error`: the error taxonomy shared by all of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use relink_core::{build_generic, codec::encode, Document};
//! use serde_json::json;
//!
//! let document = Document::from_value(json!({
//!     "primary": {
//!         "type": "quote",
//!         "id": "q1",
//!         "relationships": {"customer": {"data": {"type": "customer", "local_id": "LID-C"}}}
//!     },
//!     "included": [{"type": "customer", "local_id": "LID-C", "attributes": {"w": "z"}}]
//! }))?;
//!
//! let quote = build_generic(&document)?.into_one().unwrap();
//! let customer = quote.relationship("customer");
//!
//! // Encoding produces an equivalent document.
//! assert_eq!(encode(&quote)?, document);
//! ```

pub mod codec;
pub mod error;
pub mod factory;
pub mod graph;

pub use codec::{encode, encode_many, Document, GraphBuilder, OneOrMany};
pub use error::{Error, Result, ValidationFailure};
pub use factory::{FactoryOptions, NodeFactory, NodeFactoryBuilder};
pub use graph::{
    apply_defaults, equal, GenericVariant, Node, NodeVariant, Relationship, ResourceKey,
    TaggedVariant,
};

/// Build a document with generic nodes for every type.
pub fn build_generic(document: &Document) -> Result<OneOrMany<Node>> {
    NodeFactory::generic().build(document)
}
