//! Remision models: concrete batches and their material-usage lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{MaterialId, PlantId, RemisionId, RemisionLineId, UserId};

/// A remision header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remision {
    pub id: RemisionId,
    pub remision_number: String,
    pub plant_id: PlantId,
    /// Date the material was consumed; lots received later are not eligible.
    pub consumption_date: NaiveDate,
    /// Set once FIFO allocation has been committed.
    pub fifo_confirmed_at: Option<DateTime<Utc>>,
    pub fifo_confirmed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Remision {
    /// Whether FIFO allocation has already been committed for this remision.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.fifo_confirmed_at.is_some()
    }
}

/// A material-usage line of a remision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemisionLine {
    pub id: RemisionLineId,
    pub remision_id: RemisionId,
    pub material_id: MaterialId,
    /// Quantity actually used (kg).
    pub quantity_kg: Decimal,
    /// Weighted unit cost written back after allocation (4 dp).
    pub unit_cost_weighted: Option<Decimal>,
    /// Exact FIFO cost written back after allocation.
    pub total_cost_fifo: Option<Decimal>,
    pub fifo_allocated_at: Option<DateTime<Utc>>,
}

/// Input for creating a remision with its lines.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRemisionInput {
    pub remision_number: String,
    pub plant_id: PlantId,
    pub consumption_date: NaiveDate,
    pub lines: Vec<RemisionLineInput>,
}

/// One material-usage line of [`CreateRemisionInput`].
#[derive(Debug, Clone, Deserialize)]
pub struct RemisionLineInput {
    pub material_id: MaterialId,
    pub quantity_kg: Decimal,
}
