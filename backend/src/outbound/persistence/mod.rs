//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Thin adapters only: row structs and schema definitions stay internal, and
//! every database error is mapped into the domain's port error taxonomy. The
//! locked-slug uniqueness constraint lives in the database (a partial unique
//! index applied by the migrations below) — the adapter surfaces its
//! rejections, it does not emulate it.

mod diesel_directory_store;
mod models;
mod pool;
mod schema;

pub use diesel_directory_store::DieselDirectoryStore;
pub use pool::{DbPool, PoolConfig, PoolError};

use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

/// Embedded SQL migrations, applied at startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Errors raised while preparing the database schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaSetupError {
    /// Could not connect to the database.
    #[error("failed to connect for migrations: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Migration {
        /// Underlying failure description.
        message: String,
    },
}

/// Apply pending migrations over a short-lived synchronous connection.
///
/// Runs before the async pool is built, so a partially migrated schema is
/// never served.
///
/// # Errors
///
/// [`SchemaSetupError::Connection`] when the database is unreachable,
/// [`SchemaSetupError::Migration`] when a migration fails.
pub fn run_pending_migrations(database_url: &str) -> Result<usize, SchemaSetupError> {
    let mut conn =
        PgConnection::establish(database_url).map_err(|err| SchemaSetupError::Connection {
            message: err.to_string(),
        })?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| SchemaSetupError::Migration {
            message: err.to_string(),
        })?;

    info!(count = applied.len(), "database migrations applied");
    Ok(applied.len())
}
