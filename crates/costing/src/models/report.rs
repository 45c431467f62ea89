//! Read-side report models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{MaterialId, PlantId, RemisionId, RemisionLineId, Valuation};

use super::AllocationDetail;

/// Current value of one material's stock at one plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialValuation {
    pub material_id: MaterialId,
    pub plant_id: PlantId,
    #[serde(flatten)]
    pub valuation: Valuation,
}

/// FIFO cost of one remision line, read back from the allocation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCost {
    pub remision_line_id: RemisionLineId,
    /// Exact sum of the line's allocation rows.
    pub total_cost: Decimal,
    /// Total quantity allocated (kg).
    pub quantity: Decimal,
    pub allocations: Vec<AllocationDetail>,
}

/// FIFO cost of a whole remision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemisionCost {
    pub remision_id: RemisionId,
    /// Exact sum of every allocation row of the remision.
    pub total_cost: Decimal,
    pub lines: Vec<LineCost>,
}
