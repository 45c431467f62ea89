//! Recording receipts into the entry ledger.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};

use concreto_core::{is_storable_price, is_storable_quantity};

use crate::db::{CatalogRepository, EntryRepository};
use crate::error::CostingError;
use crate::models::entry::{CreateEntryInput, Entry};

/// Records new receiving lots.
pub struct ReceivingService {
    pool: PgPool,
}

impl ReceivingService {
    /// Create a new receiving service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a receipt as a new cost layer.
    ///
    /// # Errors
    ///
    /// Returns `CostingError::InvalidInput` for a non-positive quantity, a
    /// negative price, a value with more decimal places than the ledger
    /// stores, or an unknown material or plant.
    /// Returns `CostingError::Repository` if the insert fails.
    #[instrument(
        skip(self, input),
        fields(material_id = %input.material_id, plant_id = %input.plant_id)
    )]
    pub async fn record_entry(&self, input: &CreateEntryInput) -> Result<Entry, CostingError> {
        validate_entry(input)?;

        let (material_known, plant_known) = CatalogRepository::new(&self.pool)
            .material_and_plant_exist(input.material_id, input.plant_id)
            .await?;
        if !material_known {
            return Err(CostingError::InvalidInput(format!(
                "unknown material {}",
                input.material_id
            )));
        }
        if !plant_known {
            return Err(CostingError::InvalidInput(format!(
                "unknown plant {}",
                input.plant_id
            )));
        }

        let entry = EntryRepository::new(&self.pool).create_entry(input).await?;
        info!(
            entry_number = %entry.entry_number,
            quantity = %entry.quantity_received,
            "Recorded receipt"
        );
        Ok(entry)
    }
}

fn validate_entry(input: &CreateEntryInput) -> Result<(), CostingError> {
    if input.quantity_received <= Decimal::ZERO {
        return Err(CostingError::InvalidInput(format!(
            "quantity received must be positive, got {}",
            input.quantity_received
        )));
    }
    if !is_storable_quantity(input.quantity_received) {
        return Err(CostingError::InvalidInput(format!(
            "quantity received cannot be stored exactly: {}",
            input.quantity_received
        )));
    }
    if let Some(price) = input.unit_price {
        if price < Decimal::ZERO {
            return Err(CostingError::InvalidInput(
                "unit price must not be negative".to_string(),
            ));
        }
        if !is_storable_price(price) {
            return Err(CostingError::InvalidInput(format!(
                "unit price cannot be stored exactly: {price}"
            )));
        }
    }
    Ok(())
}
