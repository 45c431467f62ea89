//! Seed the database from a YAML file.
//!
//! Plants and materials are upserted by code; price rows, lots and
//! remisions are inserted. Remisions whose number already exists at the
//! plant are skipped, so re-running a seed file only duplicates lots.
//!
//! Records reference each other by code:
//!
//! ```yaml
//! plants:
//!   - code: P001
//!     name: Planta Norte
//! materials:
//!   - code: CEM-CPC30
//!     name: Cemento CPC 30R
//!     category: cemento
//! entries:
//!   - material: CEM-CPC30
//!     plant: P001
//!     quantity: "100"
//!     unit_price: "10"
//!     received_at: 2026-01-01T08:00:00Z
//! remisions:
//!   - number: R-0001
//!     plant: P001
//!     consumption_date: 2026-01-03
//!     lines:
//!       - material: CEM-CPC30
//!         quantity_kg: "150"
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use concreto_core::{MaterialId, PlantId, is_storable_price, is_storable_quantity};
use concreto_costing::CostingState;
use concreto_costing::db::{CatalogRepository, RemisionRepository, RepositoryError};
use concreto_costing::models::{
    CreateEntryInput, CreateMaterialInput, CreatePlantInput, CreatePriceInput,
    CreateRemisionInput, RemisionLineInput,
};

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub plants: Vec<CreatePlantInput>,
    pub materials: Vec<CreateMaterialInput>,
    pub prices: Vec<SeedPrice>,
    pub entries: Vec<SeedEntry>,
    pub remisions: Vec<SeedRemision>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPrice {
    pub material: String,
    pub plant: String,
    pub price_per_unit: Decimal,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SeedEntry {
    pub material: String,
    pub plant: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRemision {
    pub number: String,
    pub plant: String,
    pub consumption_date: NaiveDate,
    pub lines: Vec<SeedLine>,
}

#[derive(Debug, Deserialize)]
pub struct SeedLine {
    pub material: String,
    pub quantity_kg: Decimal,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: String },
}

/// Summary of a seeding run.
#[derive(Debug, Default)]
struct SeedSummary {
    plants: usize,
    materials: usize,
    prices: usize,
    entries: usize,
    remisions: usize,
    remisions_skipped: usize,
}

/// Seed the database from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// references an unknown code, or a database write fails.
pub async fn run(state: &CostingState, file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_string()).into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    // Validate before touching the database
    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()).into());
    }

    let summary = apply_seed(state, &seed).await?;

    info!("Seeding complete!");
    info!("  Plants: {}", summary.plants);
    info!("  Materials: {}", summary.materials);
    info!("  Price rows: {}", summary.prices);
    info!("  Entries: {}", summary.entries);
    info!("  Remisions: {}", summary.remisions);
    if summary.remisions_skipped > 0 {
        info!("  Remisions skipped (already exist): {}", summary.remisions_skipped);
    }
    Ok(())
}

async fn apply_seed(
    state: &CostingState,
    seed: &SeedFile,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let catalog = CatalogRepository::new(state.pool());
    let mut codes = CodeResolver::new(&catalog);
    let mut summary = SeedSummary::default();

    for input in &seed.plants {
        let plant = catalog.upsert_plant(input).await?;
        codes.plants.insert(plant.code, plant.id);
        summary.plants += 1;
    }

    for input in &seed.materials {
        let material = catalog.upsert_material(input).await?;
        codes.materials.insert(material.code, material.id);
        summary.materials += 1;
    }

    for price in &seed.prices {
        let input = CreatePriceInput {
            material_id: codes.material(&price.material).await?,
            plant_id: codes.plant(&price.plant).await?,
            price_per_unit: price.price_per_unit,
            effective_date: price.effective_date,
            end_date: price.end_date,
        };
        catalog.add_price(&input).await?;
        summary.prices += 1;
    }

    let receiving = state.receiving();
    for entry in &seed.entries {
        let input = CreateEntryInput {
            material_id: codes.material(&entry.material).await?,
            plant_id: codes.plant(&entry.plant).await?,
            quantity_received: entry.quantity,
            unit_price: entry.unit_price,
            received_at: entry.received_at,
            entered_by: None,
        };
        receiving.record_entry(&input).await?;
        summary.entries += 1;
    }

    let remisions = RemisionRepository::new(state.pool());
    for remision in &seed.remisions {
        let mut lines = Vec::with_capacity(remision.lines.len());
        for line in &remision.lines {
            lines.push(RemisionLineInput {
                material_id: codes.material(&line.material).await?,
                quantity_kg: line.quantity_kg,
            });
        }
        let input = CreateRemisionInput {
            remision_number: remision.number.clone(),
            plant_id: codes.plant(&remision.plant).await?,
            consumption_date: remision.consumption_date,
            lines,
        };

        match remisions.create_remision(&input).await {
            Ok((created, _)) => {
                info!(remision_id = %created.id, number = %created.remision_number, "Created remision");
                summary.remisions += 1;
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!(number = %remision.number, %reason, "Skipping remision");
                summary.remisions_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

/// Resolves codes to IDs, preferring records created by this seed run.
struct CodeResolver<'a> {
    catalog: &'a CatalogRepository<'a>,
    plants: HashMap<String, PlantId>,
    materials: HashMap<String, MaterialId>,
}

impl<'a> CodeResolver<'a> {
    fn new(catalog: &'a CatalogRepository<'a>) -> Self {
        Self {
            catalog,
            plants: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    async fn plant(&mut self, code: &str) -> Result<PlantId, Box<dyn std::error::Error>> {
        if let Some(id) = self.plants.get(code) {
            return Ok(*id);
        }
        let plant = self
            .catalog
            .plant_by_code(code)
            .await?
            .ok_or_else(|| SeedError::UnknownCode {
                kind: "plant",
                code: code.to_string(),
            })?;
        self.plants.insert(plant.code, plant.id);
        Ok(plant.id)
    }

    async fn material(&mut self, code: &str) -> Result<MaterialId, Box<dyn std::error::Error>> {
        if let Some(id) = self.materials.get(code) {
            return Ok(*id);
        }
        let material = self
            .catalog
            .material_by_code(code)
            .await?
            .ok_or_else(|| SeedError::UnknownCode {
                kind: "material",
                code: code.to_string(),
            })?;
        self.materials.insert(material.code, material.id);
        Ok(material.id)
    }
}

/// Check quantities, prices and dates without touching the database.
fn validate_seed(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for price in &seed.prices {
        if price.price_per_unit < Decimal::ZERO {
            errors.push(format!(
                "price for {} at {}: price_per_unit must not be negative",
                price.material, price.plant
            ));
        }
        if !is_storable_price(price.price_per_unit) {
            errors.push(format!(
                "price for {} at {}: price_per_unit has more than 4 decimal places",
                price.material, price.plant
            ));
        }
        if price.end_date.is_some_and(|end| end < price.effective_date) {
            errors.push(format!(
                "price for {} at {}: end_date precedes effective_date",
                price.material, price.plant
            ));
        }
    }

    for entry in &seed.entries {
        if entry.quantity <= Decimal::ZERO {
            errors.push(format!(
                "entry of {} at {}: quantity must be positive",
                entry.material, entry.plant
            ));
        }
        if !is_storable_quantity(entry.quantity) {
            errors.push(format!(
                "entry of {} at {}: quantity has more than 3 decimal places",
                entry.material, entry.plant
            ));
        }
        if entry.unit_price.is_some_and(|p| !is_storable_price(p)) {
            errors.push(format!(
                "entry of {} at {}: unit_price has more than 4 decimal places",
                entry.material, entry.plant
            ));
        }
        if entry.unit_price.is_some_and(|p| p < Decimal::ZERO) {
            errors.push(format!(
                "entry of {} at {}: unit_price must not be negative",
                entry.material, entry.plant
            ));
        }
    }

    for remision in &seed.remisions {
        if remision.lines.is_empty() {
            errors.push(format!("remision {}: has no lines", remision.number));
        }
        for line in &remision.lines {
            if line.quantity_kg < Decimal::ZERO {
                errors.push(format!(
                    "remision {}: quantity_kg of {} must not be negative",
                    remision.number, line.material
                ));
            }
            if !is_storable_quantity(line.quantity_kg) {
                errors.push(format!(
                    "remision {}: quantity_kg of {} has more than 3 decimal places",
                    remision.number, line.material
                ));
            }
        }
    }

    errors
}
