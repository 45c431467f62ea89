//! Database operations for the entry ledger (receiving lots).
//!
//! Reads that feed an allocation go through [`lock_available_layers`] inside
//! the confirmation transaction; plain reads through [`EntryRepository`] are
//! for reporting and may be slightly stale.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use concreto_core::{EntryId, MaterialId, PlantId, UserId};

use super::RepositoryError;
use crate::models::entry::{CreateEntryInput, Entry, EntryFilter};

const ENTRY_NUMBER_PREFIX: &str = "ENT";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for entry queries.
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: i32,
    entry_number: String,
    material_id: i32,
    plant_id: i32,
    quantity_received: Decimal,
    quantity_remaining: Decimal,
    unit_price: Option<Decimal>,
    received_at: DateTime<Utc>,
    entered_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: EntryId::new(row.id),
            entry_number: row.entry_number,
            material_id: MaterialId::new(row.material_id),
            plant_id: PlantId::new(row.plant_id),
            quantity_received: row.quantity_received,
            quantity_remaining: row.quantity_remaining,
            unit_price: row.unit_price,
            received_at: row.received_at,
            entered_by: row.entered_by.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for entry ledger reads and receipts.
pub struct EntryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EntryRepository<'a> {
    /// Create a new entry repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a receipt and assign its entry number.
    ///
    /// Numbers follow `ENT-YYYYMMDD-NNN`, sequenced per plant and receipt
    /// date. A transaction-scoped advisory lock serializes concurrent
    /// receipts for the same plant and date so numbers never collide.
    /// `quantity_remaining` starts equal to `quantity_received`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a constraint rejects the row
    /// (e.g. non-positive quantity or unknown material).
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(
        skip(self, input),
        fields(material_id = %input.material_id, plant_id = %input.plant_id)
    )]
    pub async fn create_entry(&self, input: &CreateEntryInput) -> Result<Entry, RepositoryError> {
        let receipt_date = input.received_at.date_naive();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("material_entry:{}:{receipt_date}", input.plant_id))
            .execute(&mut *tx)
            .await?;

        let last: Option<String> = sqlx::query_scalar(
            r"
            SELECT entry_number
            FROM inventory.material_entry
            WHERE plant_id = $1 AND entry_number LIKE $2
            ORDER BY length(entry_number) DESC, entry_number DESC
            LIMIT 1
            ",
        )
        .bind(input.plant_id)
        .bind(format!("{}%", entry_number_stem(receipt_date)))
        .fetch_optional(&mut *tx)
        .await?;

        let sequence = last.as_deref().and_then(parse_entry_sequence).unwrap_or(0) + 1;
        let entry_number = format_entry_number(receipt_date, sequence);

        let row = sqlx::query_as::<_, EntryRow>(
            r"
            INSERT INTO inventory.material_entry (
                entry_number, material_id, plant_id, quantity_received,
                quantity_remaining, unit_price, received_at, entered_by
            )
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7)
            RETURNING
                id, entry_number, material_id, plant_id, quantity_received,
                quantity_remaining, unit_price, received_at, entered_by, created_at
            ",
        )
        .bind(&entry_number)
        .bind(input.material_id)
        .bind(input.plant_id)
        .bind(input.quantity_received)
        .bind(input.unit_price)
        .bind(input.received_at)
        .bind(input.entered_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        tx.commit().await?;

        debug!(entry_number = %entry_number, "Recorded material entry");
        Ok(row.into())
    }

    /// Get an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, RepositoryError> {
        let row = sqlx::query_as::<_, EntryRow>(
            r"
            SELECT
                id, entry_number, material_id, plant_id, quantity_received,
                quantity_remaining, unit_price, received_at, entered_by, created_at
            FROM inventory.material_entry
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List entries for a material at a plant, in FIFO order.
    ///
    /// Without a `limit` every matching lot is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>, RepositoryError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r"
            SELECT
                id, entry_number, material_id, plant_id, quantity_received,
                quantity_remaining, unit_price, received_at, entered_by, created_at
            FROM inventory.material_entry
            WHERE material_id = $1
              AND plant_id = $2
              AND (NOT $3 OR quantity_remaining > 0)
            ORDER BY received_at ASC, id ASC
            LIMIT $4
            ",
        )
        .bind(filter.material_id)
        .bind(filter.plant_id)
        .bind(filter.only_available)
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Read every undepleted lot of a material at a plant without locking.
    ///
    /// Used for valuation; never feed the result into an allocation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_layers(
        &self,
        material_id: MaterialId,
        plant_id: PlantId,
    ) -> Result<Vec<Entry>, RepositoryError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r"
            SELECT
                id, entry_number, material_id, plant_id, quantity_received,
                quantity_remaining, unit_price, received_at, entered_by, created_at
            FROM inventory.material_entry
            WHERE material_id = $1 AND plant_id = $2 AND quantity_remaining > 0
            ORDER BY received_at ASC, id ASC
            ",
        )
        .bind(material_id)
        .bind(plant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Read and row-lock the lots eligible for a consumption, in FIFO order.
///
/// Rows are locked (`FOR UPDATE`) in `(received_at, id)` order, so two
/// confirmations competing for the same material acquire locks in the same
/// sequence. The second waits until the first commits or rolls back and
/// then sees the depleted quantities.
///
/// # Errors
///
/// Returns `RepositoryError::ConcurrentModification` if the lock wait
/// exceeds `lock_timeout` or a deadlock is detected.
/// Returns `RepositoryError::Database` for other database errors.
#[instrument(
    skip_all,
    fields(material_id = %material_id, plant_id = %plant_id, as_of = %as_of)
)]
pub async fn lock_available_layers(
    conn: &mut PgConnection,
    material_id: MaterialId,
    plant_id: PlantId,
    as_of: NaiveDate,
) -> Result<Vec<Entry>, RepositoryError> {
    let rows = sqlx::query_as::<_, EntryRow>(
        r"
        SELECT
            id, entry_number, material_id, plant_id, quantity_received,
            quantity_remaining, unit_price, received_at, entered_by, created_at
        FROM inventory.material_entry
        WHERE material_id = $1
          AND plant_id = $2
          AND quantity_remaining > 0
          AND (received_at AT TIME ZONE 'UTC')::date <= $3
        ORDER BY received_at ASC, id ASC
        FOR UPDATE
        ",
    )
    .bind(material_id)
    .bind(plant_id)
    .bind(as_of)
    .fetch_all(conn)
    .await?;

    debug!(layers = rows.len(), "Locked cost layers");
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Atomically decrement a lot's remaining quantity.
///
/// The update only applies if the lot still holds at least `quantity`, so a
/// stale snapshot can never drive `quantity_remaining` below zero.
///
/// # Errors
///
/// Returns `RepositoryError::ConcurrentModification` if the guard rejects
/// the update (the lot changed since it was read).
/// Returns `RepositoryError::Database` for other database errors.
pub async fn decrement_remaining(
    conn: &mut PgConnection,
    entry_id: EntryId,
    quantity: Decimal,
) -> Result<Decimal, RepositoryError> {
    let remaining: Option<Decimal> = sqlx::query_scalar(
        r"
        UPDATE inventory.material_entry
        SET quantity_remaining = quantity_remaining - $2
        WHERE id = $1 AND quantity_remaining >= $2
        RETURNING quantity_remaining
        ",
    )
    .bind(entry_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;

    remaining.ok_or_else(|| {
        RepositoryError::ConcurrentModification(format!(
            "entry {entry_id} no longer holds {quantity} kg"
        ))
    })
}

// =============================================================================
// Entry numbers
// =============================================================================

fn entry_number_stem(date: NaiveDate) -> String {
    format!("{ENTRY_NUMBER_PREFIX}-{}-", date.format("%Y%m%d"))
}

/// Format an entry number: `ENT-YYYYMMDD-NNN`.
fn format_entry_number(date: NaiveDate, sequence: u32) -> String {
    format!("{}{sequence:03}", entry_number_stem(date))
}

/// Extract the trailing sequence from an entry number.
fn parse_entry_sequence(entry_number: &str) -> Option<u32> {
    entry_number.rsplit('-').next()?.parse().ok()
}

fn map_constraint_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && let Some(constraint) = db_err.constraint()
    {
        return RepositoryError::Conflict(format!("material entry violates {constraint}"));
    }
    RepositoryError::from(err)
}
