//! Database operations for remisions and their material-usage lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use concreto_core::{
    MaterialId, PlantId, RemisionId, RemisionLineId, UserId, is_storable_quantity,
};

use super::RepositoryError;
use crate::models::remision::{CreateRemisionInput, Remision, RemisionLine};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RemisionRow {
    id: i32,
    remision_number: String,
    plant_id: i32,
    consumption_date: NaiveDate,
    fifo_confirmed_at: Option<DateTime<Utc>>,
    fifo_confirmed_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<RemisionRow> for Remision {
    fn from(row: RemisionRow) -> Self {
        Self {
            id: RemisionId::new(row.id),
            remision_number: row.remision_number,
            plant_id: PlantId::new(row.plant_id),
            consumption_date: row.consumption_date,
            fifo_confirmed_at: row.fifo_confirmed_at,
            fifo_confirmed_by: row.fifo_confirmed_by.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RemisionLineRow {
    id: i32,
    remision_id: i32,
    material_id: i32,
    quantity_kg: Decimal,
    unit_cost_weighted: Option<Decimal>,
    total_cost_fifo: Option<Decimal>,
    fifo_allocated_at: Option<DateTime<Utc>>,
}

impl From<RemisionLineRow> for RemisionLine {
    fn from(row: RemisionLineRow) -> Self {
        Self {
            id: RemisionLineId::new(row.id),
            remision_id: RemisionId::new(row.remision_id),
            material_id: MaterialId::new(row.material_id),
            quantity_kg: row.quantity_kg,
            unit_cost_weighted: row.unit_cost_weighted,
            total_cost_fifo: row.total_cost_fifo,
            fifo_allocated_at: row.fifo_allocated_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for remision reads and creation.
pub struct RemisionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RemisionRepository<'a> {
    /// Create a new remision repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a remision together with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidInput` if a line quantity is negative
    /// or has more decimal places than the schema stores.
    /// Returns `RepositoryError::Conflict` if the remision number is taken at
    /// the plant or a line references an unknown material.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, input), fields(remision_number = %input.remision_number))]
    pub async fn create_remision(
        &self,
        input: &CreateRemisionInput,
    ) -> Result<(Remision, Vec<RemisionLine>), RepositoryError> {
        validate_lines(input)?;

        let mut tx = self.pool.begin().await?;

        let remision = sqlx::query_as::<_, RemisionRow>(
            r"
            INSERT INTO inventory.remision (remision_number, plant_id, consumption_date)
            VALUES ($1, $2, $3)
            RETURNING id, remision_number, plant_id, consumption_date,
                      fifo_confirmed_at, fifo_confirmed_by, created_at
            ",
        )
        .bind(&input.remision_number)
        .bind(input.plant_id)
        .bind(input.consumption_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_error)?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let row = sqlx::query_as::<_, RemisionLineRow>(
                r"
                INSERT INTO inventory.remision_material (remision_id, material_id, quantity_kg)
                VALUES ($1, $2, $3)
                RETURNING id, remision_id, material_id, quantity_kg,
                          unit_cost_weighted, total_cost_fifo, fifo_allocated_at
                ",
            )
            .bind(remision.id)
            .bind(line.material_id)
            .bind(line.quantity_kg)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_constraint_error)?;
            lines.push(row.into());
        }

        tx.commit().await?;
        Ok((remision.into(), lines))
    }

    /// Get a remision by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_remision(&self, id: RemisionId) -> Result<Option<Remision>, RepositoryError> {
        let row = sqlx::query_as::<_, RemisionRow>(
            r"
            SELECT id, remision_number, plant_id, consumption_date,
                   fifo_confirmed_at, fifo_confirmed_by, created_at
            FROM inventory.remision
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a single remision line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_line(
        &self,
        id: RemisionLineId,
    ) -> Result<Option<RemisionLine>, RepositoryError> {
        let row = sqlx::query_as::<_, RemisionLineRow>(
            r"
            SELECT id, remision_id, material_id, quantity_kg,
                   unit_cost_weighted, total_cost_fifo, fifo_allocated_at
            FROM inventory.remision_material
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All lines of a remision, in line order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_lines(
        &self,
        remision_id: RemisionId,
    ) -> Result<Vec<RemisionLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, RemisionLineRow>(
            r"
            SELECT id, remision_id, material_id, quantity_kg,
                   unit_cost_weighted, total_cost_fifo, fifo_allocated_at
            FROM inventory.remision_material
            WHERE remision_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(remision_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Lock a remision header for the rest of the transaction.
///
/// Serializes confirmations of the same remision: a second caller blocks
/// here until the first commits, then observes `fifo_confirmed_at`.
///
/// # Errors
///
/// Returns `RepositoryError::ConcurrentModification` on lock timeout.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn lock_remision(
    conn: &mut PgConnection,
    id: RemisionId,
) -> Result<Option<Remision>, RepositoryError> {
    let row = sqlx::query_as::<_, RemisionRow>(
        r"
        SELECT id, remision_number, plant_id, consumption_date,
               fifo_confirmed_at, fifo_confirmed_by, created_at
        FROM inventory.remision
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Lines of a remision that consume material (`quantity_kg > 0`), in line order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_consuming_lines(
    conn: &mut PgConnection,
    remision_id: RemisionId,
) -> Result<Vec<RemisionLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, RemisionLineRow>(
        r"
        SELECT id, remision_id, material_id, quantity_kg,
               unit_cost_weighted, total_cost_fifo, fifo_allocated_at
        FROM inventory.remision_material
        WHERE remision_id = $1 AND quantity_kg > 0
        ORDER BY id ASC
        ",
    )
    .bind(remision_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Write the FIFO cost of a line back onto the line.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the line does not exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn record_line_cost(
    conn: &mut PgConnection,
    line_id: RemisionLineId,
    unit_cost_weighted: Decimal,
    total_cost_fifo: Decimal,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE inventory.remision_material
        SET unit_cost_weighted = $2, total_cost_fifo = $3, fifo_allocated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(line_id)
    .bind(unit_cost_weighted)
    .bind(total_cost_fifo)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Stamp a remision as confirmed.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the remision does not exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn mark_confirmed(
    conn: &mut PgConnection,
    id: RemisionId,
    confirmed_by: UserId,
) -> Result<DateTime<Utc>, RepositoryError> {
    let confirmed_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        r"
        UPDATE inventory.remision
        SET fifo_confirmed_at = NOW(), fifo_confirmed_by = $2
        WHERE id = $1
        RETURNING fifo_confirmed_at
        ",
    )
    .bind(id)
    .bind(confirmed_by)
    .fetch_optional(conn)
    .await?;

    confirmed_at.ok_or(RepositoryError::NotFound)
}

fn map_constraint_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && let Some(constraint) = db_err.constraint()
    {
        return RepositoryError::Conflict(format!("remision violates {constraint}"));
    }
    RepositoryError::from(err)
}

/// Line quantities must be stored as given: a value the column would round
/// could turn a real consumption into zero.
fn validate_lines(input: &CreateRemisionInput) -> Result<(), RepositoryError> {
    for line in &input.lines {
        if line.quantity_kg < Decimal::ZERO {
            return Err(RepositoryError::InvalidInput(format!(
                "quantity_kg of material {} must not be negative, got {}",
                line.material_id, line.quantity_kg
            )));
        }
        if !is_storable_quantity(line.quantity_kg) {
            return Err(RepositoryError::InvalidInput(format!(
                "quantity_kg of material {} cannot be stored exactly: {}",
                line.material_id, line.quantity_kg
            )));
        }
    }
    Ok(())
}
