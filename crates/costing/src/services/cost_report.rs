//! FIFO cost of remision lines, read back from the allocation ledger.

use sqlx::PgPool;
use tracing::instrument;

use concreto_core::{RemisionId, RemisionLineId, checked_sum};

use crate::db::{AllocationRepository, RemisionRepository};
use crate::error::CostingError;
use crate::models::allocation::AllocationDetail;
use crate::models::report::{LineCost, RemisionCost};

/// Cost breakdowns of confirmed remisions.
pub struct CostReportService {
    pool: PgPool,
}

impl CostReportService {
    /// Create a new cost report service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cost of one remision line.
    ///
    /// An unconfirmed line reports zero cost and no allocations.
    ///
    /// # Errors
    ///
    /// Returns `CostingError::NotFound` if the line does not exist.
    /// Returns `CostingError::Repository` if a query fails.
    #[instrument(skip_all, fields(remision_line_id = %line_id))]
    pub async fn line_cost(&self, line_id: RemisionLineId) -> Result<LineCost, CostingError> {
        RemisionRepository::new(&self.pool)
            .get_line(line_id)
            .await?
            .ok_or_else(|| CostingError::NotFound(format!("remision line {line_id}")))?;

        let allocations = AllocationRepository::new(&self.pool)
            .list_for_line(line_id)
            .await?;

        summarize_line(line_id, allocations)
    }

    /// Cost of every line of a remision.
    ///
    /// # Errors
    ///
    /// Returns `CostingError::NotFound` if the remision does not exist.
    /// Returns `CostingError::Repository` if a query fails.
    #[instrument(skip_all, fields(remision_id = %remision_id))]
    pub async fn remision_cost(&self, remision_id: RemisionId) -> Result<RemisionCost, CostingError> {
        let remisions = RemisionRepository::new(&self.pool);
        remisions
            .get_remision(remision_id)
            .await?
            .ok_or_else(|| CostingError::NotFound(format!("remision {remision_id}")))?;

        let lines = remisions.list_lines(remision_id).await?;
        let mut allocations = AllocationRepository::new(&self.pool)
            .list_for_remision(remision_id)
            .await?;

        let mut line_costs = Vec::with_capacity(lines.len());
        for line in &lines {
            let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut allocations)
                .into_iter()
                .partition(|a| a.allocation.remision_line_id == line.id);
            allocations = rest;
            line_costs.push(summarize_line(line.id, own)?);
        }

        let total_cost = checked_sum(line_costs.iter().map(|l| l.total_cost)).ok_or_else(|| {
            CostingError::InvalidInput(format!("total cost of remision {remision_id} overflows"))
        })?;

        Ok(RemisionCost {
            remision_id,
            total_cost,
            lines: line_costs,
        })
    }
}

/// Exact totals over a line's allocation rows.
fn summarize_line(
    line_id: RemisionLineId,
    allocations: Vec<AllocationDetail>,
) -> Result<LineCost, CostingError> {
    let overflow =
        || CostingError::InvalidInput(format!("cost of remision line {line_id} overflows"));
    let total_cost =
        checked_sum(allocations.iter().map(|a| a.allocation.total_cost)).ok_or_else(overflow)?;
    let quantity =
        checked_sum(allocations.iter().map(|a| a.allocation.quantity)).ok_or_else(overflow)?;

    Ok(LineCost {
        remision_line_id: line_id,
        total_cost,
        quantity,
        allocations,
    })
}
