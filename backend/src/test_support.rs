//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Only compiled for tests or when the `test-support` feature is enabled.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::ports::{DirectoryStore, DirectoryStoreError};
use crate::domain::{EntityDocument, EntityKind, UniquenessScope};

/// In-memory directory store with the same constraint semantics as the
/// PostgreSQL adapter.
///
/// `commit_locked_slug` performs its duplicate check and its write under a
/// single mutex guard, mirroring the atomicity of the database's partial
/// unique index. Probes and commits take the lock separately, so concurrent
/// tasks exercise exactly the probe/commit race window the allocator must
/// recover from.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    entities: Mutex<HashMap<(EntityKind, Uuid), EntityDocument>>,
    related: Mutex<HashMap<(String, Uuid), Value>>,
}

impl InMemoryDirectoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity snapshot.
    pub fn insert_entity(&self, document: EntityDocument) {
        self.entities
            .lock()
            .expect("entity map lock")
            .insert((document.kind, document.id), document);
    }

    /// Seed a related record in a named collection.
    pub fn insert_related(&self, collection: &str, id: Uuid, fields: Value) {
        self.related
            .lock()
            .expect("related map lock")
            .insert((collection.to_owned(), id), fields);
    }

    /// Current snapshot of an entity, if present.
    pub fn entity(&self, kind: EntityKind, id: Uuid) -> Option<EntityDocument> {
        self.entities
            .lock()
            .expect("entity map lock")
            .get(&(kind, id))
            .cloned()
    }

    /// Every locked slug currently held for a kind.
    pub fn locked_slugs(&self, kind: EntityKind) -> Vec<String> {
        self.entities
            .lock()
            .expect("entity map lock")
            .values()
            .filter(|doc| doc.kind == kind && doc.slug.locked)
            .filter_map(|doc| doc.slug.slug.clone())
            .collect()
    }

    fn in_scope(document: &EntityDocument, scope: UniquenessScope) -> bool {
        match scope {
            UniquenessScope::LockedOnly => document.slug.locked,
            UniquenessScope::PublishedOnly => document.text_field("status") == Some("published"),
        }
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn load_entity(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        Ok(self.entity(kind, id))
    }

    async fn load_related(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Value>, DirectoryStoreError> {
        Ok(self
            .related
            .lock()
            .expect("related map lock")
            .get(&(collection.to_owned(), id))
            .cloned())
    }

    async fn slug_exists(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, DirectoryStoreError> {
        let entities = self.entities.lock().expect("entity map lock");
        Ok(entities.values().any(|doc| {
            doc.kind == kind
                && Some(doc.id) != exclude
                && doc.slug.slug.as_deref() == Some(slug)
                && Self::in_scope(doc, scope)
        }))
    }

    async fn commit_locked_slug(
        &self,
        kind: EntityKind,
        id: Uuid,
        slug: &str,
    ) -> Result<(), DirectoryStoreError> {
        // Single guard across check and write: this is the store-side
        // constraint the allocator relies on.
        let mut entities = self.entities.lock().expect("entity map lock");

        let conflict = entities.values().any(|doc| {
            doc.kind == kind
                && doc.id != id
                && doc.slug.locked
                && doc.slug.slug.as_deref() == Some(slug)
        });
        if conflict {
            return Err(DirectoryStoreError::duplicate_slug(format!(
                "kind={kind} slug={slug}"
            )));
        }

        let Some(document) = entities.get_mut(&(kind, id)) else {
            return Err(DirectoryStoreError::query(format!(
                "{kind} {id} vanished during slug commit"
            )));
        };
        document.slug.slug = Some(slug.to_owned());
        document.slug.locked = true;
        Ok(())
    }

    async fn clear_lock(&self, kind: EntityKind, id: Uuid) -> Result<(), DirectoryStoreError> {
        let mut entities = self.entities.lock().expect("entity map lock");
        let Some(document) = entities.get_mut(&(kind, id)) else {
            return Err(DirectoryStoreError::query(format!(
                "{kind} {id} not found while clearing lock"
            )));
        };
        document.slug.locked = false;
        Ok(())
    }

    async fn find_by_locked_slug(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        let entities = self.entities.lock().expect("entity map lock");
        Ok(entities
            .values()
            .find(|doc| {
                doc.kind == kind
                    && doc.slug.locked
                    && doc.slug.slug.as_deref() == Some(slug)
                    && (scope == UniquenessScope::LockedOnly || Self::in_scope(doc, scope))
            })
            .cloned())
    }
}
