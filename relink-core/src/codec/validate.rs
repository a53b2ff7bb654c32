//! Document Validation
//!
//! Batch checks run by [`GraphBuilder`](super::GraphBuilder). Each pass scans
//! everything it is responsible for and reports every problem at once, so a
//! caller fixing a document sees the whole list rather than one issue per
//! attempt.

use indexmap::{IndexMap, IndexSet};

use super::document::{Entity, Reference};
use crate::error::{Error, Result};
use crate::graph::KeyTable;

/// Turn collected reasons into a failure, logging it first.
pub(crate) fn finish(pass: &str, reasons: Vec<String>) -> Result<()> {
    match Error::from_reasons(reasons) {
        Some(err) => {
            tracing::debug!(pass, reasons = err.reasons().len(), "document rejected");
            Err(err)
        }
        None => Ok(()),
    }
}

/// No two records may share a `(type, id)` or a `(type, local_id)` pair.
pub(crate) fn check_unique_keys<'a>(records: impl IntoIterator<Item = &'a Entity>) -> Result<()> {
    let mut counts: IndexMap<(&str, &str, &str), usize> = IndexMap::new();
    for record in records {
        let identities = [("id", record.id.as_deref()), ("local_id", record.local_id.as_deref())];
        for (kind, value) in identities {
            if let Some(value) = value {
                *counts.entry((record.type_tag.as_str(), kind, value)).or_default() += 1;
            }
        }
    }

    let reasons = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((type_tag, kind, value), _)| {
            format!("Resource {type_tag} has duplicate {kind}: {value}.")
        })
        .collect();
    finish("unique keys", reasons)
}

/// Check every relationship reference before any of them is resolved.
///
/// A reference needs an `id` or a `local_id`, and must not carry the
/// record-only members `attributes` or `relationships`. A problem repeated by
/// several references is reported once.
pub(crate) fn check_references<'a>(
    references: impl IntoIterator<Item = &'a Reference>,
) -> Result<()> {
    let mut reasons: IndexSet<String> = IndexSet::new();
    for reference in references {
        let type_tag = &reference.type_tag;
        if reference.id.is_none() && reference.local_id.is_none() {
            reasons.insert(format!(
                "Relationship for type '{type_tag}' must contain either 'id' or 'local_id'"
            ));
        }
        for member in reference.stray_members() {
            reasons.insert(format!(
                "Relationship '{type_tag}' cannot contain the key '{member}'"
            ));
        }
    }
    finish("references", reasons.into_iter().collect())
}

/// Every included record must be the target of some relationship, and every
/// relationship target known only by local id must have an included record.
pub(crate) fn check_includes_match(included: &KeyTable, relationships: &KeyTable) -> Result<()> {
    let mut reasons = Vec::new();

    let mut orphans: Vec<&str> = included
        .keys()
        .filter(|key| !relationships.contains(key))
        .map(|key| key.type_tag())
        .collect();
    if !orphans.is_empty() {
        orphans.sort_unstable();
        reasons.push(format!(
            "Missing matching relationship for these included items: {}",
            orphans.join(", ")
        ));
    }

    let mut missing: Vec<&str> = relationships
        .keys()
        .filter(|key| !included.contains(key))
        .filter_map(|key| key.local_id())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        reasons.push(format!(
            "Missing matching include for relationship local ids: {}",
            missing.join(", ")
        ));
    }

    finish("includes", reasons)
}
