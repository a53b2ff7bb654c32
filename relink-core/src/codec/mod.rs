//! Document Codec
//!
//! Converts between flat [`Document`]s and linked node graphs.
//!
//! - [`GraphBuilder`] decodes: records become nodes and references become
//!   shared handles, after the document passes its referential checks.
//! - [`encode`] and [`encode_many`] go the other way, emitting each node's
//!   record once no matter how often it is reached.
//!
//! ```rust,ignore
//! use relink_core::codec::{encode, Document};
//! use relink_core::NodeFactory;
//!
//! let document = Document::from_json(text)?;
//! let quote = NodeFactory::generic().build(&document)?.into_one();
//! let again = encode(&quote.unwrap())?;
//! ```

mod builder;
mod document;
mod encode;
mod validate;

pub use builder::GraphBuilder;
pub use document::{Document, Entity, OneOrMany, Reference, RelField, WireRelationships};
pub use encode::{encode, encode_many, entity, reference, references};
