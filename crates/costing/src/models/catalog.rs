//! Catalog models: plants, materials, and the fallback price list.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{MaterialId, PlantId};

/// A production plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A raw material (cement, aggregate, admixture, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub code: String,
    pub name: String,
    pub category: String,
    pub unit_of_measure: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a plant.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlantInput {
    pub code: String,
    pub name: String,
}

/// Input for creating a material.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialInput {
    pub code: String,
    pub name: String,
    pub category: String,
}

/// Input for adding a price-list row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePriceInput {
    pub material_id: MaterialId,
    pub plant_id: PlantId,
    pub price_per_unit: Decimal,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}
