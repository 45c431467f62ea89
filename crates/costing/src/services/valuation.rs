//! Inventory valuation: current value of the undepleted lots.

use sqlx::PgPool;
use tracing::instrument;

use concreto_core::{CostLayer, MaterialId, PlantId, value_layers};

use crate::db::{CatalogRepository, EntryRepository};
use crate::error::CostingError;
use crate::models::report::MaterialValuation;

/// Read-only valuation reports.
///
/// Reads are not locked and may trail an in-flight confirmation; never
/// base an allocation on them.
pub struct ValuationService {
    pool: PgPool,
}

impl ValuationService {
    /// Create a new valuation service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Value the remaining stock of a material at a plant, lot by lot.
    ///
    /// # Errors
    ///
    /// Returns `CostingError::InvalidInput` for an unknown material or plant,
    /// or if the value exceeds the decimal range.
    /// Returns `CostingError::Repository` if a query fails.
    #[instrument(skip_all, fields(material_id = %material_id, plant_id = %plant_id))]
    pub async fn get_valuation(
        &self,
        material_id: MaterialId,
        plant_id: PlantId,
    ) -> Result<MaterialValuation, CostingError> {
        let (material_known, plant_known) = CatalogRepository::new(&self.pool)
            .material_and_plant_exist(material_id, plant_id)
            .await?;
        if !material_known {
            return Err(CostingError::InvalidInput(format!(
                "unknown material {material_id}"
            )));
        }
        if !plant_known {
            return Err(CostingError::InvalidInput(format!("unknown plant {plant_id}")));
        }

        let layers: Vec<CostLayer> = EntryRepository::new(&self.pool)
            .available_layers(material_id, plant_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(MaterialValuation {
            material_id,
            plant_id,
            valuation: value_layers(&layers)?,
        })
    }
}
