//! Error Types
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! follow the failure taxonomy of the codec:
//!
//! - configuration errors happen while assembling a [`NodeFactory`](crate::NodeFactory)
//! - content validation errors describe a bad document or a bad graph, and
//!   carry every reason a batch pass found
//! - lookup and usage errors come from the overlay accessors on
//!   [`Node`](crate::Node)
//! - wire errors wrap the serde backends at the byte boundary

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The factory cannot be assembled from the supplied variants.
    #[error("invalid factory configuration: {0}")]
    Configuration(String),

    /// No variant is registered for a type tag and generic fallback is off.
    #[error("No known variant for type {type_tag}")]
    UnknownType {
        /// The unmatched type tag.
        type_tag: String,
    },

    /// The document or graph is well-formed but semantically invalid.
    #[error("{0}")]
    ContentValidation(ValidationFailure),

    /// A key is present in neither the attributes nor the relationships.
    #[error("key not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// The API was called in a way that can never succeed.
    #[error("{0}")]
    Usage(String),

    /// JSON could not be parsed into, or produced from, a document.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack bytes could not be decoded into a document.
    #[error("invalid MessagePack document: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    /// A document could not be written as MessagePack.
    #[error("failed to write MessagePack document: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),
}

impl Error {
    /// Build a content validation error from a single reason.
    pub fn content(reason: impl Into<String>) -> Self {
        Self::ContentValidation(ValidationFailure::new(vec![reason.into()]))
    }

    /// Build a content validation error from several reasons.
    ///
    /// Returns `None` when `reasons` is empty so callers can write
    /// `if let Some(err) = Error::from_reasons(found) { return Err(err) }`.
    pub fn from_reasons(reasons: Vec<String>) -> Option<Self> {
        if reasons.is_empty() {
            None
        } else {
            Some(Self::ContentValidation(ValidationFailure::new(reasons)))
        }
    }

    /// Reasons carried by a content validation error; empty for other kinds.
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::ContentValidation(failure) => failure.reasons(),
            _ => &[],
        }
    }

    /// Whether this is a content validation error.
    pub fn is_content_validation(&self) -> bool {
        matches!(self, Self::ContentValidation(_))
    }
}

/// One or more reasons a document or graph failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    reasons: Vec<String>,
}

impl ValidationFailure {
    fn new(reasons: Vec<String>) -> Self {
        Self { reasons }
    }

    /// All collected reasons, in the order they were found.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reasons.join("; "))
    }
}
