//! Wire Document
//!
//! Serde types for the flat, reference-based document:
//!
//! ```text
//! Document  := { primary: Entity | [Entity], included?: [Entity] }
//! Entity    := { type, id?, local_id?, attributes?, relationships?: { name: RelField } }
//! RelField  := { data: null | Reference | [Reference] }
//! Reference := { type, id?, local_id? }
//! ```
//!
//! On input, `data` is accepted for `primary` and `lid` for `local_id`.
//! Unknown members such as `links` or `meta` are ignored. Identifiers may be
//! strings, numbers or booleans and are coerced to strings.

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::graph::{Attributes, ResourceKey};

/// Message used when a `type` member is not a string.
pub(crate) const NON_STRING_TYPE: &str = "`type` must be a string";

/// Either a single value or an ordered list of values.
///
/// A document's primary payload and a relationship's `data` both take this
/// shape, and [`GraphBuilder`](super::GraphBuilder) returns nodes in the same
/// shape as the document's primary payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values, possibly empty.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// View the values as a slice, one element for [`OneOrMany::One`].
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    /// Whether this is the list form.
    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    /// The single value, if this is the single form.
    pub fn into_one(self) -> Option<T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(_) => None,
        }
    }

    /// All values as a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    /// Convert every value, keeping the shape.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
        match self {
            OneOrMany::One(value) => OneOrMany::One(f(value)),
            OneOrMany::Many(values) => OneOrMany::Many(values.into_iter().map(f).collect()),
        }
    }

    /// Convert every value with a fallible function, keeping the shape.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<OneOrMany<U>, E> {
        Ok(match self {
            OneOrMany::One(value) => OneOrMany::One(f(value)?),
            OneOrMany::Many(values) => {
                OneOrMany::Many(values.into_iter().map(f).collect::<std::result::Result<_, _>>()?)
            }
        })
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

// Buffered through `Value` so errors from the element type keep their message.
impl<'de, T: DeserializeOwned> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| T::deserialize(item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(OneOrMany::Many)
                .map_err(D::Error::custom),
            other => T::deserialize(other)
                .map(OneOrMany::One)
                .map_err(D::Error::custom),
        }
    }
}

/// A complete document: primary records plus supporting included records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The records the document is about.
    #[serde(alias = "data")]
    pub primary: OneOrMany<Entity>,
    /// Records that supply data for relationship targets.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub included: Vec<Entity>,
}

impl Document {
    /// A document with one primary record and no includes.
    pub fn single(entity: Entity) -> Self {
        Self {
            primary: OneOrMany::One(entity),
            included: Vec::new(),
        }
    }

    /// A document with a list of primary records and no includes.
    pub fn many(entities: Vec<Entity>) -> Self {
        Self {
            primary: OneOrMany::Many(entities),
            included: Vec::new(),
        }
    }

    /// Replace the included records.
    pub fn with_included(mut self, included: Vec<Entity>) -> Self {
        self.included = included;
        self
    }

    /// Every record, primary first, then included, in document order.
    pub fn records(&self) -> impl Iterator<Item = &Entity> {
        self.primary.as_slice().iter().chain(&self.included)
    }

    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Convert a parsed JSON value into a document.
    ///
    /// A record or reference whose `type` is not a string is a content
    /// validation error rather than a decode error.
    pub fn from_value(value: Value) -> Result<Self> {
        if !type_members_are_strings(&value) {
            return Err(Error::content(NON_STRING_TYPE));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Render the document as compact JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render the document as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a document from MessagePack bytes.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let value: Value = rmp_serde::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Encode the document as MessagePack, with records written as maps.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }
}

/// Whether every record and reference `type` in a raw document is a string.
///
/// Absent `type` members pass here and are reported by the typed decode.
fn type_members_are_strings(document: &Value) -> bool {
    ["primary", "data", "included"]
        .iter()
        .filter_map(|member| document.get(member))
        .flat_map(items)
        .all(|record| {
            type_is_string(record)
                && record
                    .get("relationships")
                    .and_then(Value::as_object)
                    .map_or(true, |relationships| {
                        relationships
                            .values()
                            .filter_map(|field| field.get("data"))
                            .flat_map(items)
                            .all(type_is_string)
                    })
        })
}

fn items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Null => &[],
        other => std::slice::from_ref(other),
    }
}

fn type_is_string(record: &Value) -> bool {
    record.get("type").map_or(true, Value::is_string)
}

/// Relationships of a record as they appear on the wire.
///
/// A `None` value is a relationship written as `null`.
pub type WireRelationships = IndexMap<String, Option<RelField>>;

/// One record: a resource with its identity, data and relationship references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// The resource type.
    #[serde(rename = "type", deserialize_with = "type_tag")]
    pub type_tag: String,
    /// Persistent id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "identifier"
    )]
    pub id: Option<String>,
    /// Document-scoped temporary id.
    #[serde(
        default,
        alias = "lid",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "identifier"
    )]
    pub local_id: Option<String>,
    /// Opaque data.
    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub attributes: Attributes,
    /// References to other resources.
    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub relationships: WireRelationships,
}

impl Entity {
    /// A record with only a type.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            id: None,
            local_id: None,
            attributes: Attributes::new(),
            relationships: WireRelationships::new(),
        }
    }

    /// Set the persistent id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the local id.
    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Add one relationship. `None` data writes `{"data": null}`.
    pub fn with_relationship(
        mut self,
        key: impl Into<String>,
        data: Option<OneOrMany<Reference>>,
    ) -> Self {
        self.relationships.insert(key.into(), Some(RelField { data }));
        self
    }

    /// The record's resource key.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.type_tag.clone(), self.id.clone(), self.local_id.clone())
    }

    /// Every reference in this record's relationships, in document order.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.relationships
            .values()
            .flatten()
            .filter_map(|field| field.data.as_ref())
            .flat_map(OneOrMany::as_slice)
    }
}

/// The value of one relationship on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelField {
    /// The referenced resource or resources. `None` is written as `null`.
    #[serde(default)]
    pub data: Option<OneOrMany<Reference>>,
}

/// A pointer to a resource by type plus id or local id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// The referenced resource type.
    #[serde(rename = "type", deserialize_with = "type_tag")]
    pub type_tag: String,
    /// Persistent id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "identifier"
    )]
    pub id: Option<String>,
    /// Document-scoped temporary id.
    #[serde(
        default,
        alias = "lid",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "identifier"
    )]
    pub local_id: Option<String>,
    // Members a reference must not carry; kept only so validation can name
    // them.
    #[serde(
        rename = "attributes",
        default,
        skip_serializing,
        deserialize_with = "present"
    )]
    stray_attributes: Option<Value>,
    #[serde(
        rename = "relationships",
        default,
        skip_serializing,
        deserialize_with = "present"
    )]
    stray_relationships: Option<Value>,
}

impl Reference {
    /// A reference from its identity parts.
    pub fn new(type_tag: impl Into<String>, id: Option<String>, local_id: Option<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            id,
            local_id,
            stray_attributes: None,
            stray_relationships: None,
        }
    }

    /// A reference by persistent id.
    pub fn by_id(type_tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(type_tag, Some(id.into()), None)
    }

    /// A reference by local id.
    pub fn by_local_id(type_tag: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self::new(type_tag, None, Some(local_id.into()))
    }

    /// The referenced resource key.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.type_tag.clone(), self.id.clone(), self.local_id.clone())
    }

    /// Names of record-only members this reference carried on input.
    pub fn stray_members(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            ("attributes", self.stray_attributes.is_some()),
            ("relationships", self.stray_relationships.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
    }
}

fn type_tag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(tag) => Ok(tag),
        _ => Err(D::Error::custom(NON_STRING_TYPE)),
    }
}

fn identifier<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "identifiers must be strings, numbers or booleans, got {other}"
        ))),
    }
}

fn present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
