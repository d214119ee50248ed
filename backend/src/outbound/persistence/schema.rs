//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. The locked
//! slug uniqueness constraint is a partial unique index over `(kind, slug)
//! WHERE slug_locked` and therefore has no representation here; adapters rely
//! on the database rejecting violating writes.

diesel::table! {
    /// Directory entities of every sluggable kind.
    ///
    /// Heterogeneous record shapes share one table: per-kind fields live in
    /// the `payload` jsonb column, while the columns the slug service filters
    /// on (`kind`, `slug`, `slug_locked`, `status`) are promoted for
    /// indexing.
    directory_entities (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Entity kind tag (`clinic`, `doctor`, `blog-post`, `job-posting`).
        kind -> Varchar,
        /// Current slug value; preview until `slug_locked` is set.
        slug -> Nullable<Varchar>,
        /// Whether the slug is permanent and authoritative.
        slug_locked -> Bool,
        /// Publication status for kinds that gate on it (e.g. blog posts).
        status -> Nullable<Varchar>,
        /// Remaining per-kind record fields.
        payload -> Jsonb,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Owning account records referenced by doctor profiles.
    directory_accounts (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Account fields (display name, approval flag, …).
        payload -> Jsonb,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(directory_entities, directory_accounts);
