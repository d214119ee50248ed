//! Diesel row structs for the directory store adapter.
//!
//! Internal to the persistence layer; the adapter converts rows to domain
//! [`crate::domain::EntityDocument`] values and never leaks them outward.

use diesel::prelude::*;
use uuid::Uuid;

use super::schema::directory_entities;

/// Selectable row of the `directory_entities` table.
///
/// Audit timestamps are deliberately not selected; the slug service never
/// reads them.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = directory_entities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EntityRow {
    pub id: Uuid,
    pub kind: String,
    pub slug: Option<String>,
    pub slug_locked: bool,
    pub status: Option<String>,
    pub payload: serde_json::Value,
}
