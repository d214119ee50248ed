//! Entity snapshots, relation references, and the slug record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::EntityKind;

/// Slug state persisted on an entity's own storage record.
///
/// ## Invariants
/// - While `locked` is `false`, `slug` may be absent or hold a preview value
///   with no uniqueness guarantee.
/// - Once `locked` is `true`, `slug` is present, immutable, unique within the
///   entity kind's uniqueness scope, and satisfies the slug format grammar.
/// - The `false → true` transition is one-way. Only the forced-regeneration
///   administrative path may re-open a record, and it clears `locked` first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugRecord {
    /// Current slug value, if any.
    pub slug: Option<String>,
    /// Whether the slug is permanent and authoritative.
    pub locked: bool,
}

impl SlugRecord {
    /// A record with no slug yet, as created alongside a new entity.
    pub fn vacant() -> Self {
        Self {
            slug: None,
            locked: false,
        }
    }

    /// An unlocked preview value with no uniqueness guarantee.
    pub fn preview(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            locked: false,
        }
    }

    /// A locked, authoritative slug.
    pub fn locked(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            locked: true,
        }
    }
}

/// A reference to a related owning record, as it appears inside an entity's
/// fields.
///
/// Callers populate relations differently depending on code path: some
/// pre-expand the related record inline, some store a reference object
/// exposing only an identifier, and some store the raw identifier string.
/// All three shapes resolve through this one type instead of ad hoc shape
/// checks at each call site.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationRef {
    /// The related record's fields are inlined on the referencing entity.
    Expanded(Value),
    /// An object of the form `{"id": "<uuid>"}`.
    Reference(Uuid),
    /// A bare identifier string.
    Raw(Uuid),
}

impl RelationRef {
    /// Interpret a JSON value as a relation reference.
    ///
    /// Returns `None` when the value matches none of the three shapes (for
    /// example a JSON number, or an id that is not a UUID).
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => Uuid::parse_str(raw).ok().map(Self::Raw),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(raw)) = map.get("id") {
                        return Uuid::parse_str(raw).ok().map(Self::Reference);
                    }
                }
                Some(Self::Expanded(value.clone()))
            }
            _ => None,
        }
    }
}

/// Loosely typed snapshot of a stored directory record.
///
/// The slug service is generic over entity shapes, so field access goes
/// through the JSON payload the store returned rather than per-kind structs.
/// The payload is read-only here; the service writes only through the store
/// port's conditional commit.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDocument {
    /// Store identifier of the record.
    pub id: Uuid,
    /// Entity kind the record belongs to.
    pub kind: EntityKind,
    /// Current slug state.
    pub slug: SlugRecord,
    /// Remaining record fields as stored.
    pub fields: Value,
}

impl EntityDocument {
    /// Build a snapshot from its parts.
    pub fn new(id: Uuid, kind: EntityKind, slug: SlugRecord, fields: Value) -> Self {
        Self {
            id,
            kind,
            slug,
            fields,
        }
    }

    /// Non-empty trimmed text value of a field, if present.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        text_field(&self.fields, name)
    }

    /// Boolean value of a field, if present.
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        bool_field(&self.fields, name)
    }

    /// Relation reference stored under a field, if present and well-formed.
    pub fn relation(&self, name: &str) -> Option<RelationRef> {
        self.fields.get(name).and_then(RelationRef::parse)
    }
}

/// Non-empty trimmed text value of a field on a raw JSON document.
pub(crate) fn text_field<'a>(fields: &'a Value, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Boolean value of a field on a raw JSON document.
pub(crate) fn bool_field(fields: &Value, name: &str) -> Option<bool> {
    fields.get(name).and_then(Value::as_bool)
}
