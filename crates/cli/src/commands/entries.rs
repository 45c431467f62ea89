//! List receiving lots of a material at a plant.

use tracing::info;

use concreto_core::{MaterialId, PlantId};
use concreto_costing::CostingState;
use concreto_costing::db::EntryRepository;
use concreto_costing::models::EntryFilter;

/// Log lots in FIFO order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn run(
    state: &CostingState,
    material_id: MaterialId,
    plant_id: PlantId,
    include_depleted: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = EntryRepository::new(state.pool())
        .list_entries(&EntryFilter {
            material_id,
            plant_id,
            only_available: !include_depleted,
            limit: None,
        })
        .await?;

    info!("{} lot(s) of material {material_id} at plant {plant_id}", entries.len());
    for entry in &entries {
        let price = entry
            .unit_price
            .map_or_else(|| "unpriced".to_string(), |p| p.to_string());
        info!(
            "  {} received {} : {}/{} kg remaining @ {}{}",
            entry.entry_number,
            entry.received_at.format("%Y-%m-%d %H:%M"),
            entry.quantity_remaining,
            entry.quantity_received,
            price,
            if entry.is_exhausted() { " (exhausted)" } else { "" }
        );
    }
    Ok(())
}
