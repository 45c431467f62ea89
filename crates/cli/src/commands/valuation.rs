//! Value the remaining stock of a material at a plant.

use tracing::info;

use concreto_core::{MaterialId, PlantId, round_money};
use concreto_costing::CostingState;

use super::print_json;

/// Print the lot-by-lot valuation.
///
/// # Errors
///
/// Returns an error if the material or plant is unknown or the query fails.
pub async fn run(
    state: &CostingState,
    material_id: MaterialId,
    plant_id: PlantId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = state
        .valuations()
        .get_valuation(material_id, plant_id)
        .await?;

    if json {
        print_json(&report)?;
        return Ok(());
    }

    let valuation = &report.valuation;
    info!("Valuation of material {material_id} at plant {plant_id}");
    info!("  Total value: {}", round_money(valuation.total_value));
    info!("  Total quantity: {} kg", valuation.total_quantity);
    if !valuation.unpriced_quantity.is_zero() {
        info!("  Unpriced quantity: {} kg", valuation.unpriced_quantity);
    }
    for layer in &valuation.layers {
        let price = layer
            .unit_price
            .map_or_else(|| "unpriced".to_string(), |p| p.to_string());
        info!(
            "  {} {} kg @ {} = {}",
            layer.entry_number, layer.quantity_remaining, price, layer.layer_value
        );
    }

    Ok(())
}
