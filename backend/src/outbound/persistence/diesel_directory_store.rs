//! PostgreSQL-backed `DirectoryStore` implementation using Diesel ORM.
//!
//! The adapter translates between rows and domain documents and maps Diesel
//! errors into the port taxonomy. The correctness-critical mapping is
//! `UniqueViolation` → [`DirectoryStoreError::DuplicateSlug`]: the partial
//! unique index over `(kind, slug) WHERE slug_locked` is what serialises
//! concurrent lock commits, and the allocator recovers from its rejections.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{DirectoryStore, DirectoryStoreError};
use crate::domain::{EntityDocument, EntityKind, SlugRecord, UniquenessScope, UnknownEntityKind};

use super::models::EntityRow;
use super::pool::{DbPool, PoolError};
use super::schema::{directory_accounts, directory_entities};

/// Diesel-backed implementation of the `DirectoryStore` port.
#[derive(Clone)]
pub struct DieselDirectoryStore {
    pool: DbPool,
}

impl DieselDirectoryStore {
    /// Create a store adapter over a connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to port errors.
fn map_pool_error(error: PoolError) -> DirectoryStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DirectoryStoreError::connection(message)
        }
    }
}

/// Map Diesel errors to port errors.
fn map_diesel_error(error: diesel::result::Error) -> DirectoryStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DirectoryStoreError::query("record not found"),
        DieselError::DatabaseError(kind, _) => match kind {
            DatabaseErrorKind::UniqueViolation => {
                DirectoryStoreError::duplicate_slug("locked slug constraint violated")
            }
            DatabaseErrorKind::ClosedConnection => {
                DirectoryStoreError::connection("database connection error")
            }
            _ => DirectoryStoreError::query("database error"),
        },
        _ => DirectoryStoreError::query("database error"),
    }
}

/// Convert a database row to a domain entity document.
///
/// The promoted `status` column is folded back into the payload so the
/// domain sees one uniform field set.
fn row_to_document(row: EntityRow) -> Result<EntityDocument, DirectoryStoreError> {
    let kind: EntityKind = row.kind.parse().map_err(|err: UnknownEntityKind| {
        DirectoryStoreError::corrupt(format!("entity {}: {err}", row.id))
    })?;

    let mut fields = row.payload;
    match &mut fields {
        Value::Object(map) => {
            if let Some(status) = row.status {
                map.entry("status").or_insert(Value::String(status));
            }
        }
        _ => {
            return Err(DirectoryStoreError::corrupt(format!(
                "entity {} payload is not a JSON object",
                row.id
            )));
        }
    }

    let slug = SlugRecord {
        slug: row.slug,
        locked: row.slug_locked,
    };
    Ok(EntityDocument::new(row.id, kind, slug, fields))
}

#[async_trait]
impl DirectoryStore for DieselDirectoryStore {
    async fn load_entity(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<EntityRow> = directory_entities::table
            .filter(
                directory_entities::id
                    .eq(id)
                    .and(directory_entities::kind.eq(kind.as_str())),
            )
            .select(EntityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_document).transpose()
    }

    async fn load_related(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Value>, DirectoryStoreError> {
        if collection != "accounts" {
            return Err(DirectoryStoreError::query(format!(
                "unknown related collection {collection:?}"
            )));
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        directory_accounts::table
            .filter(directory_accounts::id.eq(id))
            .select(directory_accounts::payload)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }

    async fn slug_exists(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, DirectoryStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = directory_entities::table
            .filter(directory_entities::kind.eq(kind.as_str()))
            .filter(directory_entities::slug.eq(slug))
            .into_boxed();
        query = match scope {
            UniquenessScope::LockedOnly => {
                query.filter(directory_entities::slug_locked.eq(true))
            }
            UniquenessScope::PublishedOnly => {
                query.filter(directory_entities::status.eq("published"))
            }
        };
        if let Some(exclude) = exclude {
            query = query.filter(directory_entities::id.ne(exclude));
        }

        diesel::select(diesel::dsl::exists(query))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn commit_locked_slug(
        &self,
        kind: EntityKind,
        id: Uuid,
        slug: &str,
    ) -> Result<(), DirectoryStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            directory_entities::table.filter(
                directory_entities::id
                    .eq(id)
                    .and(directory_entities::kind.eq(kind.as_str())),
            ),
        )
        .set((
            directory_entities::slug.eq(slug),
            directory_entities::slug_locked.eq(true),
            directory_entities::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(DirectoryStoreError::query(format!(
                "{kind} {id} vanished during slug commit"
            )));
        }
        Ok(())
    }

    async fn clear_lock(&self, kind: EntityKind, id: Uuid) -> Result<(), DirectoryStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            directory_entities::table.filter(
                directory_entities::id
                    .eq(id)
                    .and(directory_entities::kind.eq(kind.as_str())),
            ),
        )
        .set((
            directory_entities::slug_locked.eq(false),
            directory_entities::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(DirectoryStoreError::query(format!(
                "{kind} {id} not found while clearing lock"
            )));
        }
        Ok(())
    }

    async fn find_by_locked_slug(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = directory_entities::table
            .filter(directory_entities::kind.eq(kind.as_str()))
            .filter(directory_entities::slug.eq(slug))
            .filter(directory_entities::slug_locked.eq(true))
            .into_boxed();
        if scope == UniquenessScope::PublishedOnly {
            query = query.filter(directory_entities::status.eq("published"));
        }

        let row: Option<EntityRow> = query
            .select(EntityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_document).transpose()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn sample_row(payload: Value) -> EntityRow {
        EntityRow {
            id: Uuid::new_v4(),
            kind: "clinic".to_owned(),
            slug: Some("city-dental-clinic".to_owned()),
            slug_locked: true,
            status: None,
            payload,
        }
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_slug() {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        let diesel_err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        );
        let store_err = map_diesel_error(diesel_err);

        assert!(
            matches!(store_err, DirectoryStoreError::DuplicateSlug { .. }),
            "expected DuplicateSlug, got {store_err:?}"
        );
    }

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool_error(PoolError::checkout("connection refused"));
        assert!(matches!(err, DirectoryStoreError::Connection { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn row_conversion_promotes_the_status_column() {
        let mut row = sample_row(json!({ "title": "Ten Tips" }));
        row.kind = "blog-post".to_owned();
        row.status = Some("published".to_owned());

        let doc = row_to_document(row).expect("row converts");
        assert_eq!(doc.kind, EntityKind::BlogPost);
        assert_eq!(doc.text_field("status"), Some("published"));
        assert!(doc.slug.locked);
    }

    #[rstest]
    fn row_conversion_rejects_unknown_kind() {
        let mut row = sample_row(json!({}));
        row.kind = "pharmacy".to_owned();

        let err = row_to_document(row).expect_err("unknown kind is corrupt data");
        assert!(matches!(err, DirectoryStoreError::Corrupt { .. }));
    }

    #[rstest]
    fn row_conversion_rejects_non_object_payload() {
        let row = sample_row(json!("not an object"));

        let err = row_to_document(row).expect_err("payload must be an object");
        assert!(matches!(err, DirectoryStoreError::Corrupt { .. }));
    }
}
