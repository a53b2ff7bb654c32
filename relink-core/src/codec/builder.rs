//! Graph Builder
//!
//! Turns a flat [`Document`] into linked [`Node`]s.
//!
//! # Phases
//!
//! 1. Reject records that share a `(type, id)` or `(type, local_id)` pair,
//!    and references without an identity or carrying record data.
//! 2. Materialize one node per primary and included record.
//! 3. Resolve every relationship reference to a node, reusing record nodes
//!    and creating bare nodes for targets the document has no record for.
//! 4. Cross-check included records against relationship targets.
//! 5. Link each record's node to its resolved targets.
//!
//! Every occurrence of a canonical key resolves to the same node, so cycles
//! and shared references in the document become cycles and shared handles
//! in the graph.

use super::document::{Document, Entity, OneOrMany, Reference};
use super::validate;
use crate::error::{Error, Result};
use crate::factory::NodeFactory;
use crate::graph::{Attributes, KeyTable, Node, Relationship, Relationships};

/// Builds node graphs from documents using a [`NodeFactory`].
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'f> {
    factory: &'f NodeFactory,
}

impl<'f> GraphBuilder<'f> {
    /// A builder that constructs nodes with `factory`.
    pub fn new(factory: &'f NodeFactory) -> Self {
        Self { factory }
    }

    /// Build the graph for `document`.
    ///
    /// Returns the primary node, or the primary nodes in document order when
    /// the primary payload is a list. Either the whole graph is linked or a
    /// content validation error lists every problem the failing pass found.
    ///
    /// Relationships are merged onto each node without replacing keys the
    /// node's variant installed at construction.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            primary = document.primary.as_slice().len(),
            included = document.included.len(),
        )
    )]
    pub fn build(&self, document: &Document) -> Result<OneOrMany<Node>> {
        validate::check_unique_keys(document.records())?;
        // Before any node exists, so factory failures cannot hide reasons.
        validate::check_references(document.records().flat_map(|record| record.references()))?;

        let primary = document
            .primary
            .as_slice()
            .iter()
            .map(|record| self.materialize(record))
            .collect::<Result<Vec<_>>>()?;
        let included = document
            .included
            .iter()
            .map(|record| self.materialize(record))
            .collect::<Result<Vec<_>>>()?;

        let primary_table: KeyTable = keyed(document.primary.as_slice(), &primary);
        let included_table: KeyTable = keyed(&document.included, &included);
        let resources = primary_table.union(&included_table);

        let relationships = self.resolve_references(document, &resources)?;
        validate::check_includes_match(&included_table, &relationships)?;

        let targets = resources.union(&relationships);
        let mut linked = 0;
        for (record, node) in document.records().zip(primary.iter().chain(&included)) {
            linked += node.merge_relationships(link(record, &targets)?);
        }

        tracing::debug!(
            records = primary.len() + included.len(),
            targets = relationships.len(),
            linked,
            "graph built"
        );

        Ok(if document.primary.is_many() {
            OneOrMany::Many(primary)
        } else {
            let mut primary = primary.into_iter();
            match (primary.next(), primary.next()) {
                (Some(node), None) => OneOrMany::One(node),
                _ => return Err(Error::Usage("single primary record expected".into())),
            }
        })
    }

    fn materialize(&self, record: &Entity) -> Result<Node> {
        let node = self.factory.instantiate(
            &record.type_tag,
            record.id.clone(),
            record.local_id.clone(),
            record.attributes.clone(),
        )?;
        tracing::trace!(key = %node.key(), "materialized record");
        Ok(node)
    }

    /// Resolve every distinct reference in the document to a node.
    fn resolve_references(&self, document: &Document, resources: &KeyTable) -> Result<KeyTable> {
        let mut relationships = KeyTable::new();
        for reference in document.records().flat_map(|record| record.references()) {
            let key = reference.key();
            if relationships.contains(&key) {
                continue;
            }
            let node = match resources.get(&key) {
                Some(node) => node.clone(),
                None => self.bare_node(reference)?,
            };
            relationships.insert(&key, node);
        }
        Ok(relationships)
    }

    /// A node for a target the document carries no record for.
    fn bare_node(&self, reference: &Reference) -> Result<Node> {
        self.factory.instantiate(
            &reference.type_tag,
            reference.id.clone(),
            reference.local_id.clone(),
            Attributes::new(),
        )
    }
}

fn keyed(records: &[Entity], nodes: &[Node]) -> KeyTable {
    records
        .iter()
        .zip(nodes)
        .map(|(record, node)| (record.key(), node.clone()))
        .collect()
}

/// Resolve one record's relationship references against `targets`.
fn link(record: &Entity, targets: &KeyTable) -> Result<Relationships> {
    let mut resolved = Relationships::new();
    for (name, field) in &record.relationships {
        let value = match field.as_ref().and_then(|field| field.data.as_ref()) {
            None => Relationship::Empty,
            Some(OneOrMany::One(reference)) => Relationship::One(target(targets, reference)?),
            Some(OneOrMany::Many(references)) => Relationship::Many(
                references
                    .iter()
                    .map(|reference| target(targets, reference))
                    .collect::<Result<_>>()?,
            ),
        };
        resolved.insert(name.clone(), value);
    }
    Ok(resolved)
}

fn target(targets: &KeyTable, reference: &Reference) -> Result<Node> {
    let key = reference.key();
    targets.get(&key).cloned().ok_or_else(|| Error::NotFound {
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeVariant, TaggedVariant};
    use serde_json::json;
    use std::sync::Arc;

    fn build(value: serde_json::Value) -> Result<OneOrMany<Node>> {
        let document = Document::from_value(value)?;
        NodeFactory::generic().build(&document)
    }

    fn one(value: serde_json::Value) -> Node {
        build(value).unwrap().into_one().unwrap()
    }

    #[test]
    fn links_primary_to_included_by_local_id() {
        let quote = one(json!({
            "primary": {
                "type": "quote",
                "id": "q1",
                "attributes": {"x": "y"},
                "relationships": {"customer": {"data": {"type": "customer", "local_id": "LID-C"}}}
            },
            "included": [{"type": "customer", "local_id": "LID-C", "attributes": {"w": "z"}}]
        }));

        assert_eq!(quote.attribute("x"), Some(json!("y")));
        let customer = quote.relationship("customer").unwrap().as_one().unwrap().clone();
        assert_eq!(customer.local_id().as_deref(), Some("LID-C"));
        assert_eq!(customer.attribute("w"), Some(json!("z")));
    }

    #[test]
    fn same_key_resolves_to_one_node() {
        let quote = one(json!({
            "primary": {
                "type": "quote",
                "id": "q1",
                "relationships": {
                    "first": {"data": {"type": "customer", "id": "c1"}},
                    "all": {"data": [{"type": "customer", "id": "c1"}, {"type": "customer", "id": "c1"}]}
                }
            }
        }));

        let first = quote.relationship("first").unwrap().as_one().unwrap().clone();
        let all = quote.relationship("all").unwrap().as_many().unwrap().to_vec();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|node| node.ptr_eq(&first)));
        assert!(!first.has_attributes());
    }

    #[test]
    fn cycles_become_shared_handles() {
        let coverage = one(json!({
            "primary": {
                "type": "coverage",
                "id": "pc1",
                "relationships": {"deductibles": {"data": [{"type": "deductible", "id": "d1"}]}}
            },
            "included": [{
                "type": "deductible",
                "id": "d1",
                "relationships": {"coverage": {"data": {"type": "coverage", "id": "pc1"}}}
            }]
        }));

        let deductible = coverage.relationship("deductibles").unwrap().as_many().unwrap()[0].clone();
        let back = deductible.relationship("coverage").unwrap().as_one().unwrap().clone();
        assert!(back.ptr_eq(&coverage));
        coverage.clear_relationships();
    }

    #[test]
    fn reference_problems_are_batched() {
        let err = build(json!({
            "primary": {
                "type": "quote",
                "relationships": {
                    "customer": {"data": {"type": "customer"}},
                    "agent": {"data": {"type": "agent", "id": "a1", "relationships": {}}}
                }
            }
        }))
        .unwrap_err();

        assert!(err.is_content_validation());
        assert_eq!(
            err.reasons(),
            [
                "Relationship for type 'customer' must contain either 'id' or 'local_id'",
                "Relationship 'agent' cannot contain the key 'relationships'",
            ]
        );
    }

    #[test]
    fn include_checks_report_together() {
        let err = build(json!({
            "primary": {
                "type": "quote",
                "relationships": {"customer": {"data": {"type": "customer", "local_id": "LID-C"}}}
            },
            "included": [{"type": "agent", "id": "a1"}]
        }))
        .unwrap_err();

        assert_eq!(
            err.reasons(),
            [
                "Missing matching relationship for these included items: agent",
                "Missing matching include for relationship local ids: LID-C",
            ]
        );
    }

    #[test]
    fn unknown_types_fail_without_fallback() {
        let factory = NodeFactory::builder()
            .register(TaggedVariant::new("quote").shared())
            .build()
            .unwrap();
        let document = Document::from_value(json!({
            "primary": {"type": "quote", "relationships": {"c": {"data": {"type": "customer", "id": "c1"}}}}
        }))
        .unwrap();

        let err = factory.build(&document).unwrap_err();
        assert!(matches!(err, Error::UnknownType { ref type_tag } if type_tag == "customer"));
    }

    #[test]
    fn reference_reasons_win_over_unknown_types() {
        let factory = NodeFactory::builder()
            .register(TaggedVariant::new("quote").shared())
            .build()
            .unwrap();
        let document = Document::from_value(json!({
            "primary": {
                "type": "quote",
                "id": "q1",
                "relationships": {
                    "agent": {"data": {"type": "agent", "id": "a1"}},
                    "parent": {"data": {"type": "quote"}},
                    "previous": {"data": {"type": "quote"}}
                }
            }
        }))
        .unwrap();

        let err = factory.build(&document).unwrap_err();
        assert_eq!(
            err.reasons(),
            ["Relationship for type 'quote' must contain either 'id' or 'local_id'"]
        );
    }

    struct Seeded;

    impl NodeVariant for Seeded {
        fn name(&self) -> &str {
            "Seeded"
        }
        fn type_tag(&self) -> Option<&str> {
            Some("quote")
        }
        fn initial_relationships(&self) -> Relationships {
            let mut map = Relationships::new();
            map.insert("customer".into(), Relationship::Empty);
            map.insert("coverages".into(), Relationship::Many(Vec::new()));
            map
        }
    }

    #[test]
    fn construction_relationships_are_kept() {
        let factory = NodeFactory::builder()
            .register(Arc::new(Seeded))
            .allow_generic(true)
            .build()
            .unwrap();
        let document = Document::from_value(json!({
            "primary": {
                "type": "quote",
                "relationships": {
                    "customer": {"data": {"type": "customer", "id": "c1"}},
                    "agent": {"data": {"type": "agent", "id": "a1"}}
                }
            }
        }))
        .unwrap();

        let quote = factory.build(&document).unwrap().into_one().unwrap();
        let relationships = quote.relationships();
        assert!(relationships["customer"].is_empty());
        assert_eq!(relationships["coverages"].as_many().unwrap().len(), 0);
        assert_eq!(relationships["agent"].as_one().unwrap().type_tag(), "agent");
    }

    #[test]
    fn list_primary_keeps_order() {
        let nodes = build(json!({
            "primary": [{"type": "document", "id": "id2"}, {"type": "document", "id": "id1"}]
        }))
        .unwrap();
        assert!(nodes.is_many());
        let ids: Vec<_> = nodes.into_vec().iter().filter_map(Node::id).collect();
        assert_eq!(ids, ["id2", "id1"]);
    }
}
