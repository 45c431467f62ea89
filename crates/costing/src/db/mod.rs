//! Database operations for the costing `PostgreSQL` schema.
//!
//! # Schema: `inventory`
//!
//! ## Tables
//!
//! - `plant`, `material` - Catalogs (used to reject unknown IDs)
//! - `material_price` - Effective-dated fallback price list
//! - `material_entry` - Entry ledger: one row per receiving lot (cost layer)
//! - `remision`, `remision_material` - Remision header and material-usage lines
//! - `material_consumption_allocation` - Append-only allocation ledger
//!
//! Queries are built at runtime (`sqlx::query_as::<_, Row>`) so the crate
//! compiles without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/costing/migrations/` and run via:
//! ```bash
//! cargo run -p concreto-cli -- migrate
//! ```

pub mod allocations;
pub mod catalog;
pub mod entries;
pub mod remisions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use allocations::AllocationRepository;
pub use catalog::CatalogRepository;
pub use entries::EntryRepository;
pub use remisions::RemisionRepository;

use crate::config::PoolConfig;

/// SQLSTATE codes that indicate lock contention rather than a real failure.
///
/// - `40001` serialization failure
/// - `40P01` deadlock detected
/// - `55P03` lock not available (`lock_timeout` expired)
const CONTENTION_SQLSTATES: &[&str] = &["40001", "40P01", "55P03"];

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate entry number).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A value the schema cannot store exactly.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A row changed underneath a guarded write, or the database reported
    /// lock contention. The whole operation should be retried from a fresh read.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if is_contention(&err) {
            return Self::ConcurrentModification(err.to_string());
        }
        Self::Database(err)
    }
}

/// Whether a sqlx error reports lock contention.
fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| CONTENTION_SQLSTATES.contains(&code.as_ref())),
        _ => false,
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `pool` - Pool sizing and timeouts
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    pool: &PoolConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// Apply a `lock_timeout` to the current transaction.
///
/// `SET LOCAL` does not accept bind parameters, so the value is formatted
/// from an integer millisecond count.
pub(crate) async fn set_lock_timeout(
    conn: &mut sqlx::PgConnection,
    timeout: Duration,
) -> Result<(), RepositoryError> {
    sqlx::query(&lock_timeout_statement(timeout))
        .execute(conn)
        .await?;
    Ok(())
}

/// `SET LOCAL lock_timeout` for `timeout`, never below 1 ms since 0
/// disables the timeout.
fn lock_timeout_statement(timeout: Duration) -> String {
    let millis = timeout.as_millis().max(1);
    format!("SET LOCAL lock_timeout = '{millis}ms'")
}
