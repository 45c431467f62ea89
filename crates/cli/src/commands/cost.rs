//! FIFO cost reports read back from the allocation ledger.

use tracing::info;

use concreto_core::{RemisionId, RemisionLineId, round_money};
use concreto_costing::CostingState;
use concreto_costing::models::LineCost;

use super::print_json;

/// Print the cost of one remision line.
///
/// # Errors
///
/// Returns an error if the line does not exist or the query fails.
pub async fn line(
    state: &CostingState,
    line_id: RemisionLineId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cost = state.cost_reports().line_cost(line_id).await?;

    if json {
        print_json(&cost)?;
    } else {
        log_line(&cost);
    }
    Ok(())
}

/// Print the cost of every line of a remision.
///
/// # Errors
///
/// Returns an error if the remision does not exist or the query fails.
pub async fn remision(
    state: &CostingState,
    remision_id: RemisionId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cost = state.cost_reports().remision_cost(remision_id).await?;

    if json {
        print_json(&cost)?;
        return Ok(());
    }

    info!(
        "Remision {remision_id}: total FIFO cost {}",
        round_money(cost.total_cost)
    );
    for line in &cost.lines {
        log_line(line);
    }
    Ok(())
}

fn log_line(cost: &LineCost) {
    info!(
        "Line {}: {} kg, cost {}",
        cost.remision_line_id,
        cost.quantity,
        round_money(cost.total_cost)
    );
    for detail in &cost.allocations {
        let a = &detail.allocation;
        info!(
            "  {} {} kg @ {} = {}",
            detail.entry_number, a.quantity, a.unit_price, a.total_cost
        );
    }
}
