//! Allocation ledger models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{
    AllocationId, EntryId, MaterialId, PlantId, PriceSource, RemisionId, RemisionLineId, UserId,
};

/// One ledger row: quantity drawn from one lot for one remision line.
///
/// Rows are append-only. `unit_price` is frozen at allocation time and is
/// never recomputed, even if the entry's price is corrected later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub remision_id: RemisionId,
    pub remision_line_id: RemisionLineId,
    pub entry_id: EntryId,
    pub material_id: MaterialId,
    pub plant_id: PlantId,
    /// Quantity consumed (kg), always positive.
    pub quantity: Decimal,
    /// Price per kg frozen at allocation time.
    pub unit_price: Decimal,
    /// `quantity × unit_price`, exact.
    pub total_cost: Decimal,
    pub price_source: PriceSource,
    pub consumption_date: NaiveDate,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// An allocation row to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllocation {
    pub remision_id: RemisionId,
    pub remision_line_id: RemisionLineId,
    pub entry_id: EntryId,
    pub material_id: MaterialId,
    pub plant_id: PlantId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub price_source: PriceSource,
    pub consumption_date: NaiveDate,
    pub created_by: Option<UserId>,
}

/// An allocation joined with its entry number, for cost breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDetail {
    pub allocation: Allocation,
    pub entry_number: String,
}
