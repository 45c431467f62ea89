//! Remision confirmation: turn material-usage lines into FIFO allocations.
//!
//! One confirmation is one database transaction:
//! 1. Lock the remision row and reject it if it is already confirmed
//! 2. For each consuming line, in line order, lock the eligible lots in FIFO
//!    order, run the allocation engine, decrement the lots and append the
//!    allocation rows
//! 3. Commit only if every line succeeded; otherwise roll back and report
//!    every failing line
//!
//! Lock contention aborts the attempt and the whole confirmation is retried
//! from a fresh snapshot, up to the configured number of attempts.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, instrument, warn};

use concreto_core::{
    AllocationResult, ConsumptionRequest, CostLayer, RemisionId, UserId, allocate, checked_sum,
};

use crate::config::ConfirmationConfig;
use crate::db::{allocations, catalog, entries, remisions, set_lock_timeout};
use crate::error::CostingError;
use crate::models::allocation::NewAllocation;
use crate::models::confirmation::{ConfirmationOutcome, LineAllocation, LineError};
use crate::models::remision::{Remision, RemisionLine};

/// Orchestrates remision confirmations.
pub struct ConfirmationService {
    pool: PgPool,
    config: ConfirmationConfig,
}

impl ConfirmationService {
    /// Create a new confirmation service.
    #[must_use]
    pub const fn new(pool: PgPool, config: ConfirmationConfig) -> Self {
        Self { pool, config }
    }

    /// Allocate every material-usage line of a remision against FIFO lots.
    ///
    /// Returns an outcome with `success = false` (and nothing persisted)
    /// when one or more lines cannot be allocated; the per-line reasons are
    /// in `errors`.
    ///
    /// # Errors
    ///
    /// - `CostingError::NotFound` if the remision does not exist
    /// - `CostingError::AlreadyConfirmed` if it was confirmed before
    /// - `CostingError::ConcurrentModification` if contention persisted
    ///   through every attempt
    /// - `CostingError::Repository` for other database failures
    #[instrument(skip_all, fields(remision_id = %remision_id, actor_id = %actor))]
    pub async fn confirm_remision(
        &self,
        remision_id: RemisionId,
        actor: UserId,
    ) -> Result<ConfirmationOutcome, CostingError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.try_confirm(remision_id, actor).await {
                Ok(mut outcome) => {
                    outcome.attempts = attempt;
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(attempt, error = %e, "Confirmation hit contention, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(attempts = attempt, error = %e, "Confirmation retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One confirmation attempt in its own transaction.
    async fn try_confirm(
        &self,
        remision_id: RemisionId,
        actor: UserId,
    ) -> Result<ConfirmationOutcome, CostingError> {
        let mut tx = self.pool.begin().await?;
        set_lock_timeout(&mut tx, self.config.lock_timeout).await?;

        let remision = remisions::lock_remision(&mut tx, remision_id)
            .await?
            .ok_or_else(|| CostingError::NotFound(format!("remision {remision_id}")))?;

        if remision.is_confirmed()
            || allocations::remision_has_allocations(&mut tx, remision_id).await?
        {
            return Err(CostingError::AlreadyConfirmed(remision_id));
        }

        let lines = remisions::list_consuming_lines(&mut tx, remision_id).await?;

        let mut allocated = Vec::with_capacity(lines.len());
        let mut errors = Vec::new();
        let mut allocations_created = 0;

        for line in &lines {
            match allocate_line(&mut tx, &remision, line, actor).await {
                Ok((line_allocation, rows)) => {
                    allocations_created += rows;
                    allocated.push(line_allocation);
                }
                Err(e) if is_line_failure(&e) => {
                    warn!(
                        remision_line_id = %line.id,
                        material_id = %line.material_id,
                        error = %e,
                        "Line could not be allocated"
                    );
                    errors.push(LineError {
                        remision_line_id: line.id,
                        material_id: line.material_id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if !errors.is_empty() {
            tx.rollback().await?;
            return Ok(ConfirmationOutcome {
                remision_id,
                success: false,
                allocations_created: 0,
                total_cost: Decimal::ZERO,
                lines: allocated,
                errors,
                attempts: 1,
            });
        }

        let total_cost = checked_sum(allocated.iter().map(|l| l.total_cost)).ok_or_else(|| {
            CostingError::InvalidInput(format!("total cost of remision {remision_id} overflows"))
        })?;

        remisions::mark_confirmed(&mut tx, remision_id, actor).await?;
        tx.commit().await?;

        info!(
            allocations_created,
            lines = allocated.len(),
            total_cost = %total_cost,
            "Remision confirmed"
        );

        Ok(ConfirmationOutcome {
            remision_id,
            success: true,
            allocations_created,
            total_cost,
            lines: allocated,
            errors,
            attempts: 1,
        })
    }
}

/// Allocate and persist one line inside the confirmation transaction.
///
/// Returns the line result and the number of allocation rows written.
/// Nothing is written unless the engine succeeds for the whole line.
async fn allocate_line(
    conn: &mut PgConnection,
    remision: &Remision,
    line: &RemisionLine,
    actor: UserId,
) -> Result<(LineAllocation, usize), CostingError> {
    if !catalog::material_exists(conn, line.material_id).await? {
        return Err(CostingError::InvalidInput(format!(
            "unknown material {}",
            line.material_id
        )));
    }

    let layers: Vec<CostLayer> = entries::lock_available_layers(
        conn,
        line.material_id,
        remision.plant_id,
        remision.consumption_date,
    )
    .await?
    .into_iter()
    .map(Into::into)
    .collect();

    let fallback_price = if layers.iter().any(|l| l.unit_price.is_none()) {
        catalog::effective_price(
            conn,
            line.material_id,
            remision.plant_id,
            remision.consumption_date,
        )
        .await?
    } else {
        None
    };

    let request = ConsumptionRequest::new(
        line.material_id,
        remision.plant_id,
        line.quantity_kg,
        remision.consumption_date,
    )
    .with_fallback_price(fallback_price);

    let result = allocate(&layers, &request)?;
    persist_line(conn, remision, line, &result, actor).await?;

    let rows = result.allocations.len();
    Ok((
        LineAllocation {
            remision_line_id: line.id,
            material_id: line.material_id,
            quantity: result.quantity,
            total_cost: result.total_cost,
            weighted_unit_cost: result.weighted_unit_cost(),
            allocations: result.allocations,
        },
        rows,
    ))
}

/// Decrement the drawn lots, append the ledger rows and write the line cost back.
async fn persist_line(
    conn: &mut PgConnection,
    remision: &Remision,
    line: &RemisionLine,
    result: &AllocationResult,
    actor: UserId,
) -> Result<(), CostingError> {
    let mut rows = Vec::with_capacity(result.allocations.len());

    for draw in &result.allocations {
        let remaining = entries::decrement_remaining(conn, draw.entry_id, draw.quantity).await?;
        if remaining != draw.remaining_after {
            return Err(CostingError::ConcurrentModification(format!(
                "entry {} left {remaining} kg, expected {}",
                draw.entry_number, draw.remaining_after
            )));
        }

        debug!(
            entry_number = %draw.entry_number,
            quantity = %draw.quantity,
            unit_price = %draw.unit_price,
            "Drew from lot"
        );

        rows.push(NewAllocation {
            remision_id: remision.id,
            remision_line_id: line.id,
            entry_id: draw.entry_id,
            material_id: result.material_id,
            plant_id: result.plant_id,
            quantity: draw.quantity,
            unit_price: draw.unit_price,
            total_cost: draw.cost,
            price_source: draw.price_source,
            consumption_date: remision.consumption_date,
            created_by: Some(actor),
        });
    }

    allocations::insert_allocations(conn, &rows).await?;
    remisions::record_line_cost(
        conn,
        line.id,
        result.weighted_unit_cost(),
        result.total_cost,
    )
    .await?;

    Ok(())
}

/// Errors that fail a single line but let the remaining lines be evaluated.
const fn is_line_failure(err: &CostingError) -> bool {
    matches!(
        err,
        CostingError::InsufficientInventory { .. }
            | CostingError::MissingUnitPrice(_)
            | CostingError::InvalidInput(_)
    )
}
