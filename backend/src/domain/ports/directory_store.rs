//! Port abstraction for the directory's backing store.
//!
//! The [`DirectoryStore`] trait is the only boundary the slug allocation
//! service talks through. Correctness under concurrency is pushed down to the
//! store: the conditional commit must be guarded by a store-enforced
//! uniqueness constraint over locked slugs, and a violation must surface as
//! the distinguishable [`DirectoryStoreError::DuplicateSlug`] class so the
//! allocator can recover from lost races. The existence probe is a read-only
//! optimization and never a substitute for that constraint.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{EntityDocument, EntityKind, UniquenessScope};

use super::define_port_error;

define_port_error! {
    /// Errors raised by directory store adapters.
    pub enum DirectoryStoreError {
        /// Store connection could not be established or was lost.
        Connection { message: String } => "directory store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "directory store query failed: {message}",
        /// The store returned data the domain cannot interpret.
        Corrupt { message: String } => "directory store returned malformed data: {message}",
        /// The conditional slug commit was rejected by the store's uniqueness
        /// constraint because a concurrent writer committed the slug first.
        DuplicateSlug { message: String } => "slug already committed by another writer: {message}",
    }
}

/// Port for reading directory entities and committing locked slugs.
///
/// Point reads reflect store state at call time. `commit_locked_slug` is the
/// single serialization point for slug allocation; adapters must implement it
/// as one atomic conditional write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Load an entity snapshot by kind and identifier.
    async fn load_entity(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError>;

    /// Load the fields of a related owning record (e.g. the account a doctor
    /// profile references) from a named collection.
    async fn load_related(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Value>, DirectoryStoreError>;

    /// Report whether any record in `scope` already carries `slug`, excluding
    /// the record identified by `exclude` (so re-locking the same entity is
    /// idempotent).
    async fn slug_exists(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, DirectoryStoreError>;

    /// Atomically persist `{slug, locked: true}` on the entity, guarded by the
    /// store's uniqueness constraint over locked slugs.
    ///
    /// Returns [`DirectoryStoreError::DuplicateSlug`] when another writer
    /// holds the slug, and [`DirectoryStoreError::Query`] when the entity row
    /// no longer exists.
    async fn commit_locked_slug(
        &self,
        kind: EntityKind,
        id: Uuid,
        slug: &str,
    ) -> Result<(), DirectoryStoreError>;

    /// Clear the lock flag on an entity. Only the forced-regeneration
    /// administrative path calls this.
    async fn clear_lock(&self, kind: EntityKind, id: Uuid) -> Result<(), DirectoryStoreError>;

    /// Find the entity holding `slug` as its locked slug, if any.
    async fn find_by_locked_slug(
        &self,
        kind: EntityKind,
        scope: UniquenessScope,
        slug: &str,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError>;
}

/// Fixture implementation for tests that do not exercise store behaviour.
///
/// Every read reports an empty store; writes are accepted and discarded.
#[derive(Debug, Default)]
pub struct FixtureDirectoryStore;

#[async_trait]
impl DirectoryStore for FixtureDirectoryStore {
    async fn load_entity(
        &self,
        _kind: EntityKind,
        _id: Uuid,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        Ok(None)
    }

    async fn load_related(
        &self,
        _collection: &str,
        _id: Uuid,
    ) -> Result<Option<Value>, DirectoryStoreError> {
        Ok(None)
    }

    async fn slug_exists(
        &self,
        _kind: EntityKind,
        _scope: UniquenessScope,
        _slug: &str,
        _exclude: Option<Uuid>,
    ) -> Result<bool, DirectoryStoreError> {
        Ok(false)
    }

    async fn commit_locked_slug(
        &self,
        _kind: EntityKind,
        _id: Uuid,
        _slug: &str,
    ) -> Result<(), DirectoryStoreError> {
        Ok(())
    }

    async fn clear_lock(&self, _kind: EntityKind, _id: Uuid) -> Result<(), DirectoryStoreError> {
        Ok(())
    }

    async fn find_by_locked_slug(
        &self,
        _kind: EntityKind,
        _scope: UniquenessScope,
        _slug: &str,
    ) -> Result<Option<EntityDocument>, DirectoryStoreError> {
        Ok(None)
    }
}
