//! Database operations for the allocation ledger.
//!
//! The ledger is append-only: this module inserts and reads, nothing else.
//! A trigger on `material_consumption_allocation` rejects updates and deletes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use concreto_core::{
    AllocationId, EntryId, MaterialId, PlantId, PriceSource, RemisionId, RemisionLineId, UserId,
};

use super::RepositoryError;
use crate::models::allocation::{Allocation, AllocationDetail, NewAllocation};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for allocation queries (joined with the entry number).
#[derive(Debug, sqlx::FromRow)]
struct AllocationRow {
    id: i32,
    remision_id: i32,
    remision_material_id: i32,
    entry_id: i32,
    material_id: i32,
    plant_id: i32,
    quantity_consumed_kg: Decimal,
    unit_price: Decimal,
    total_cost: Decimal,
    price_source: String,
    consumption_date: NaiveDate,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    entry_number: String,
}

impl TryFrom<AllocationRow> for AllocationDetail {
    type Error = RepositoryError;

    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        let price_source = parse_price_source(&row.price_source)?;
        Ok(Self {
            allocation: Allocation {
                id: AllocationId::new(row.id),
                remision_id: RemisionId::new(row.remision_id),
                remision_line_id: RemisionLineId::new(row.remision_material_id),
                entry_id: EntryId::new(row.entry_id),
                material_id: MaterialId::new(row.material_id),
                plant_id: PlantId::new(row.plant_id),
                quantity: row.quantity_consumed_kg,
                unit_price: row.unit_price,
                total_cost: row.total_cost,
                price_source,
                consumption_date: row.consumption_date,
                created_by: row.created_by.map(UserId::new),
                created_at: row.created_at,
            },
            entry_number: row.entry_number,
        })
    }
}

const SELECT_ALLOCATIONS: &str = r"
    SELECT
        a.id, a.remision_id, a.remision_material_id, a.entry_id, a.material_id,
        a.plant_id, a.quantity_consumed_kg, a.unit_price, a.total_cost,
        a.price_source, a.consumption_date, a.created_by, a.created_at,
        e.entry_number
    FROM inventory.material_consumption_allocation a
    JOIN inventory.material_entry e ON e.id = a.entry_id
";

// =============================================================================
// Repository
// =============================================================================

/// Read access to the allocation ledger.
pub struct AllocationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AllocationRepository<'a> {
    /// Create a new allocation repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All allocation rows of one remision line, in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored price source is unknown.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_line(
        &self,
        line_id: RemisionLineId,
    ) -> Result<Vec<AllocationDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, AllocationRow>(&format!(
            "{SELECT_ALLOCATIONS} WHERE a.remision_material_id = $1 \
             ORDER BY e.received_at ASC, e.id ASC"
        ))
        .bind(line_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// All allocation rows of a remision, grouped by line then FIFO order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored price source is unknown.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_remision(
        &self,
        remision_id: RemisionId,
    ) -> Result<Vec<AllocationDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, AllocationRow>(&format!(
            "{SELECT_ALLOCATIONS} WHERE a.remision_id = $1 \
             ORDER BY a.remision_material_id ASC, e.received_at ASC, e.id ASC"
        ))
        .bind(remision_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Total quantity ever drawn from a lot.
    ///
    /// For any lot, `quantity_received - quantity_remaining` equals this sum.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_consumed_for_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Decimal, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(quantity_consumed_kg), 0)
            FROM inventory.material_consumption_allocation
            WHERE entry_id = $1
            ",
        )
        .bind(entry_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Append allocation rows to the ledger.
///
/// Must run in the same transaction as the matching
/// [`decrement_remaining`](super::entries::decrement_remaining) calls.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a row duplicates an existing
/// `(remision line, entry)` pair.
/// Returns `RepositoryError::Database` for other database errors.
#[instrument(skip(conn, rows), fields(count = rows.len()))]
pub async fn insert_allocations(
    conn: &mut PgConnection,
    rows: &[NewAllocation],
) -> Result<Vec<AllocationId>, RepositoryError> {
    let mut ids = Vec::with_capacity(rows.len());

    for row in rows {
        let id: AllocationId = sqlx::query_scalar(
            r"
            INSERT INTO inventory.material_consumption_allocation (
                remision_id, remision_material_id, entry_id, material_id, plant_id,
                quantity_consumed_kg, unit_price, total_cost, price_source,
                consumption_date, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            ",
        )
        .bind(row.remision_id)
        .bind(row.remision_line_id)
        .bind(row.entry_id)
        .bind(row.material_id)
        .bind(row.plant_id)
        .bind(row.quantity)
        .bind(row.unit_price)
        .bind(row.total_cost)
        .bind(price_source_code(row.price_source))
        .bind(row.consumption_date)
        .bind(row.created_by)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(format!(
                    "entry {} already allocated to line {}",
                    row.entry_id, row.remision_line_id
                ))
            }
            other => RepositoryError::from(other),
        })?;

        ids.push(id);
    }

    debug!(count = ids.len(), "Appended allocation rows");
    Ok(ids)
}

/// Whether any allocation row exists for a remision.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn remision_has_allocations(
    conn: &mut PgConnection,
    remision_id: RemisionId,
) -> Result<bool, RepositoryError> {
    let exists: bool = sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1 FROM inventory.material_consumption_allocation WHERE remision_id = $1
        )
        ",
    )
    .bind(remision_id)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

// =============================================================================
// Price source codes
// =============================================================================

const fn price_source_code(source: PriceSource) -> &'static str {
    match source {
        PriceSource::Entry => "entry",
        PriceSource::PriceList => "price_list",
    }
}

fn parse_price_source(code: &str) -> Result<PriceSource, RepositoryError> {
    match code {
        "entry" => Ok(PriceSource::Entry),
        "price_list" => Ok(PriceSource::PriceList),
        other => Err(RepositoryError::DataCorruption(format!(
            "unknown price source: {other}"
        ))),
    }
}
