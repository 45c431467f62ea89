//! Entry ledger models: receiving lots of raw material.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use concreto_core::{CostLayer, EntryId, MaterialId, PlantId, UserId};

/// A receiving lot (cost layer).
///
/// Immutable once recorded except for `quantity_remaining`, which only
/// decreases as allocations draw from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique entry ID.
    pub id: EntryId,
    /// Human-readable entry number (`ENT-YYYYMMDD-NNN`).
    pub entry_number: String,
    /// Material received.
    pub material_id: MaterialId,
    /// Plant received into.
    pub plant_id: PlantId,
    /// Quantity received (kg).
    pub quantity_received: Decimal,
    /// Quantity still available (kg).
    pub quantity_remaining: Decimal,
    /// Price per kg, if priced at receipt.
    pub unit_price: Option<Decimal>,
    /// Receipt timestamp (defines FIFO order).
    pub received_at: DateTime<Utc>,
    /// User who recorded the receipt.
    pub entered_by: Option<UserId>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Whether every kilogram of the lot has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.quantity_remaining.is_zero()
    }
}

impl From<Entry> for CostLayer {
    fn from(entry: Entry) -> Self {
        Self {
            entry_id: entry.id,
            entry_number: entry.entry_number,
            material_id: entry.material_id,
            plant_id: entry.plant_id,
            received_at: entry.received_at,
            quantity_received: entry.quantity_received,
            quantity_remaining: entry.quantity_remaining,
            unit_price: entry.unit_price,
        }
    }
}

/// Input for recording a new receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryInput {
    /// Material received.
    pub material_id: MaterialId,
    /// Plant received into.
    pub plant_id: PlantId,
    /// Quantity received (kg), must be positive.
    pub quantity_received: Decimal,
    /// Price per kg (optional; the price list is used when absent).
    pub unit_price: Option<Decimal>,
    /// Receipt timestamp.
    pub received_at: DateTime<Utc>,
    /// User recording the receipt.
    pub entered_by: Option<UserId>,
}

/// Filter criteria for listing entries.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    /// Material to list.
    pub material_id: MaterialId,
    /// Plant to list.
    pub plant_id: PlantId,
    /// Only lots with remaining quantity > 0.
    pub only_available: bool,
    /// Maximum number of results; `None` lists every lot.
    pub limit: Option<i64>,
}
