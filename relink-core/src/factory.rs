//! Node Factory
//!
//! Maps a type tag to the [`NodeVariant`] that constructs nodes of that type.
//! Tags without a registered variant either fall back to [`GenericVariant`]
//! or fail, depending on [`FactoryOptions::allow_generic`].
//!
//! A factory is usually assembled once per application and shared:
//!
//! ```rust,ignore
//! use relink_core::{NodeFactory, TaggedVariant};
//!
//! let factory = NodeFactory::builder()
//!     .register(TaggedVariant::new("quote").shared())
//!     .register(TaggedVariant::new("customer").shared())
//!     .build()?;
//! let quote = factory.build(&document)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codec::{Document, GraphBuilder, OneOrMany};
use crate::error::{Error, Result};
use crate::graph::{Attributes, GenericVariant, Node, NodeVariant, VariantExt};

/// Factory policy that embedding applications may load from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryOptions {
    /// Use the generic variant for type tags with no registered variant.
    pub allow_generic: bool,
}

/// Picks the variant used to construct each node of a document.
#[derive(Clone)]
pub struct NodeFactory {
    variants: HashMap<String, Arc<dyn NodeVariant>>,
    generic: Arc<dyn NodeVariant>,
    options: FactoryOptions,
}

impl NodeFactory {
    /// Start assembling a factory.
    pub fn builder() -> NodeFactoryBuilder {
        NodeFactoryBuilder::default()
    }

    /// A factory with no registered variants that builds every node generically.
    pub fn generic() -> Self {
        Self {
            variants: HashMap::new(),
            generic: GenericVariant::shared(),
            options: FactoryOptions {
                allow_generic: true,
            },
        }
    }

    /// The policy this factory was built with.
    pub fn options(&self) -> FactoryOptions {
        self.options
    }

    /// Whether a variant is registered for `type_tag`.
    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.variants.contains_key(type_tag)
    }

    /// The variant that constructs nodes of `type_tag`.
    pub fn variant_for(&self, type_tag: &str) -> Result<Arc<dyn NodeVariant>> {
        match self.variants.get(type_tag) {
            Some(variant) => Ok(Arc::clone(variant)),
            None if self.options.allow_generic => Ok(Arc::clone(&self.generic)),
            None => Err(Error::UnknownType {
                type_tag: type_tag.to_owned(),
            }),
        }
    }

    /// Construct a node with the variant registered for `type_tag`.
    ///
    /// Relationships are left to the variant's initial set; the graph builder
    /// links the rest.
    pub fn instantiate(
        &self,
        type_tag: &str,
        id: Option<String>,
        local_id: Option<String>,
        attributes: Attributes,
    ) -> Result<Node> {
        self.variant_for(type_tag)?
            .builder()
            .type_tag(type_tag)
            .maybe_id(id)
            .maybe_local_id(local_id)
            .attributes(attributes)
            .build()
    }

    /// Build a linked graph from a document.
    pub fn build(&self, document: &Document) -> Result<OneOrMany<Node>> {
        GraphBuilder::new(self).build(document)
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("NodeFactory")
            .field("variants", &tags)
            .field("allow_generic", &self.options.allow_generic)
            .finish()
    }
}

/// Builder for [`NodeFactory`].
#[derive(Default)]
pub struct NodeFactoryBuilder {
    variants: Vec<Arc<dyn NodeVariant>>,
    options: FactoryOptions,
}

impl NodeFactoryBuilder {
    /// Register one variant.
    pub fn register(mut self, variant: Arc<dyn NodeVariant>) -> Self {
        self.variants.push(variant);
        self
    }

    /// Register several variants.
    pub fn register_all(mut self, variants: impl IntoIterator<Item = Arc<dyn NodeVariant>>) -> Self {
        self.variants.extend(variants);
        self
    }

    /// Enable or disable the generic fallback.
    pub fn allow_generic(mut self, allow: bool) -> Self {
        self.options.allow_generic = allow;
        self
    }

    /// Replace the whole policy.
    pub fn options(mut self, options: FactoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the registrations and produce the factory.
    ///
    /// Fails when nothing is registered and the generic fallback is off, when
    /// a variant has no type tag, or when two variants claim the same tag. The
    /// duplicate error lists every contested tag with all of its claimants.
    pub fn build(self) -> Result<NodeFactory> {
        if self.variants.is_empty() && !self.options.allow_generic {
            return Err(Error::Configuration(
                "You must register node variants and/or enable generic fallback.".into(),
            ));
        }

        let mut claimants: IndexMap<String, Vec<String>> = IndexMap::new();
        for variant in &self.variants {
            let Some(type_tag) = variant.type_tag() else {
                return Err(Error::Configuration(format!(
                    "Variant `{}` does not declare a type tag.",
                    variant.name()
                )));
            };
            claimants
                .entry(type_tag.to_owned())
                .or_default()
                .push(variant.name().to_owned());
        }

        let duplicates: Vec<String> = claimants
            .iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(tag, names)| format!("{tag}: [{}]", names.join(", ")))
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::Configuration(format!(
                "More than one variant declares the same type tag. Duplicates: {{{}}}",
                duplicates.join(", ")
            )));
        }

        let variants = self
            .variants
            .into_iter()
            .filter_map(|variant| {
                let tag = variant.type_tag()?.to_owned();
                Some((tag, variant))
            })
            .collect();
        tracing::debug!(
            registered = claimants.len(),
            allow_generic = self.options.allow_generic,
            "node factory assembled"
        );

        Ok(NodeFactory {
            variants,
            generic: GenericVariant::shared(),
            options: self.options,
        })
    }
}
