//! Confirm a remision: allocate its material usage against FIFO lots.

use tracing::{error, info, warn};

use concreto_core::{RemisionId, UserId, round_money};
use concreto_costing::CostingState;

use super::print_json;

/// Confirm a remision and report the outcome.
///
/// A remision whose lines cannot all be allocated is reported line by line
/// and returns an error so the process exits non-zero.
///
/// # Errors
///
/// Returns an error if the remision does not exist, was already confirmed,
/// contention outlasted every retry, or one or more lines failed.
pub async fn run(
    state: &CostingState,
    remision_id: RemisionId,
    actor: UserId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = state
        .confirmations()
        .confirm_remision(remision_id, actor)
        .await?;

    if json {
        print_json(&outcome)?;
    } else if outcome.success {
        info!("Remision {remision_id} confirmed");
        info!("  Allocations created: {}", outcome.allocations_created);
        info!("  Total FIFO cost: {}", round_money(outcome.total_cost));
        for line in &outcome.lines {
            info!(
                "  Line {} (material {}): {} kg, cost {}, weighted {}/kg",
                line.remision_line_id,
                line.material_id,
                line.quantity,
                round_money(line.total_cost),
                line.weighted_unit_cost
            );
            for draw in &line.allocations {
                info!(
                    "    {} {} kg @ {} = {}",
                    draw.entry_number, draw.quantity, draw.unit_price, draw.cost
                );
            }
        }
    } else {
        warn!("Remision {remision_id} was not confirmed; nothing was persisted");
        for line_error in &outcome.errors {
            error!(
                "  Line {} (material {}): [{}] {}",
                line_error.remision_line_id,
                line_error.material_id,
                line_error.kind,
                line_error.message
            );
        }
    }

    if outcome.success {
        Ok(())
    } else {
        Err(format!("{} line(s) could not be allocated", outcome.errors.len()).into())
    }
}
