//! Node Variants
//!
//! A variant is the behaviour attached to a node: the type tag it is bound
//! to, relationships it installs at construction time, and the defaults that
//! [`apply_defaults`](super::apply_defaults) fills in later.
//!
//! Variants are registered with a [`NodeFactory`](crate::NodeFactory), which
//! picks one per type tag while a document is being built.

use std::fmt;
use std::sync::Arc;

use super::node::{Attributes, Node, NodeBuilder, Relationships};

/// Behaviour shared by every node of one kind.
///
/// Only [`name`](NodeVariant::name) is required. Every other method has an
/// empty default.
pub trait NodeVariant: Send + Sync + 'static {
    /// Name used in diagnostics, such as duplicate registration errors.
    fn name(&self) -> &str;

    /// Type tag this variant is bound to.
    ///
    /// `None` means the tag must be supplied when a node is constructed.
    fn type_tag(&self) -> Option<&str> {
        None
    }

    /// Relationships installed on every freshly constructed node.
    fn initial_relationships(&self) -> Relationships {
        Relationships::new()
    }

    /// Attributes that [`apply_defaults`](super::apply_defaults) adds when missing.
    ///
    /// Called once per node per application, so the returned map is never
    /// shared between calls.
    fn default_attributes(&self, _node: &Node) -> Attributes {
        Attributes::new()
    }

    /// Relationships that [`apply_defaults`](super::apply_defaults) adds when missing.
    ///
    /// `node` is the node being defaulted, so a default may point back at it.
    fn default_relationships(&self, _node: &Node) -> Relationships {
        Relationships::new()
    }
}

impl fmt::Debug for dyn NodeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeVariant")
            .field("name", &self.name())
            .field("type_tag", &self.type_tag())
            .finish()
    }
}

/// Extension methods for shared variant handles.
pub trait VariantExt {
    /// Start building a node of this variant.
    fn builder(&self) -> NodeBuilder;
}

impl VariantExt for Arc<dyn NodeVariant> {
    fn builder(&self) -> NodeBuilder {
        Node::builder(Arc::clone(self))
    }
}

/// The fallback variant: no fixed type tag and no defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericVariant;

impl GenericVariant {
    /// Shared handle to the generic variant.
    pub fn shared() -> Arc<dyn NodeVariant> {
        Arc::new(GenericVariant)
    }
}

impl NodeVariant for GenericVariant {
    fn name(&self) -> &str {
        "GenericVariant"
    }
}

/// A variant bound to a type tag with no further behaviour.
///
/// Most registries only need to pin tags; implement [`NodeVariant`] directly
/// when defaults are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedVariant {
    name: String,
    type_tag: String,
}

impl TaggedVariant {
    /// Variant for `type_tag`, named after the tag.
    pub fn new(type_tag: impl Into<String>) -> Self {
        let type_tag = type_tag.into();
        Self {
            name: type_tag.clone(),
            type_tag,
        }
    }

    /// Variant for `type_tag` with an explicit diagnostic name.
    pub fn named(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Shared handle, ready for registration.
    pub fn shared(self) -> Arc<dyn NodeVariant> {
        Arc::new(self)
    }
}

impl NodeVariant for TaggedVariant {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> Option<&str> {
        Some(&self.type_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_variant_has_no_tag() {
        let variant = GenericVariant::shared();
        assert_eq!(variant.type_tag(), None);
        assert!(variant.initial_relationships().is_empty());
    }

    #[test]
    fn tagged_variant_is_named_after_its_tag() {
        let variant = TaggedVariant::new("quote");
        assert_eq!(variant.name(), "quote");
        assert_eq!(variant.type_tag(), Some("quote"));

        let named = TaggedVariant::named("QuoteVariant", "quote");
        assert_eq!(named.name(), "QuoteVariant");
    }

    #[test]
    fn variant_builder_fixes_the_tag() {
        let variant = TaggedVariant::new("customer").shared();
        let node = variant.builder().id("c1").build().unwrap();
        assert_eq!(node.type_tag(), "customer");
        assert_eq!(node.id().as_deref(), Some("c1"));
    }
}
