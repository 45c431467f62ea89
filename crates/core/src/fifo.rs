//! FIFO material-consumption allocation engine.
//!
//! Given a snapshot of receiving lots (cost layers) for one material at one
//! plant, [`allocate`] decides which lots a consumption is drawn from and
//! what it costs. Lots are consumed oldest first; each drawn quantity is
//! priced at its own lot's unit price, never at an average.
//!
//! The engine is a pure function. It does not mutate the snapshot and does
//! not persist anything: the caller applies the returned depletions and
//! writes the allocation rows inside its own transaction.
//!
//! # Ordering
//!
//! "First in" is defined by `received_at`, with ties broken by ascending
//! [`EntryId`]. Input order is irrelevant, so identical snapshots always
//! produce identical results.
//!
//! # All-or-nothing
//!
//! If the eligible lots cannot cover the full request the call fails with
//! [`AllocationError::InsufficientInventory`] and returns no partial result.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{EntryId, MaterialId, PlantId, weighted_unit_cost};

/// Errors produced by the allocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The requested quantity is zero or negative.
    #[error("quantity to consume must be positive (got {0})")]
    InvalidQuantity(Decimal),

    /// The eligible lots do not hold enough material.
    #[error("insufficient inventory: requested {requested} kg, available {available} kg")]
    InsufficientInventory {
        /// Quantity asked for (kg).
        requested: Decimal,
        /// Total remaining across eligible lots (kg).
        available: Decimal,
    },

    /// A lot that must be drawn from has no price and no price-list fallback exists.
    #[error("entry {entry_number} has no unit price and no price list fallback applies")]
    MissingUnitPrice {
        /// Human-readable entry number of the unpriced lot.
        entry_number: String,
    },

    /// A lot in the snapshot violates the cost-layer invariants.
    #[error("invalid cost layer {entry_number}: {reason}")]
    InvalidLayer {
        /// Human-readable entry number of the offending lot.
        entry_number: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Decimal arithmetic overflowed while costing a lot.
    #[error("arithmetic overflow while costing entry {entry_number}")]
    Overflow {
        /// Entry being costed when the overflow happened.
        entry_number: String,
    },
}

/// One receiving lot as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayer {
    /// Entry ID (tie-breaker for identical receipt times).
    pub entry_id: EntryId,
    /// Human-readable entry number (e.g. `ENT-20260105-001`).
    pub entry_number: String,
    /// Material held by the lot.
    pub material_id: MaterialId,
    /// Plant the lot was received into.
    pub plant_id: PlantId,
    /// Receipt timestamp; defines FIFO order.
    pub received_at: DateTime<Utc>,
    /// Quantity originally received (kg).
    pub quantity_received: Decimal,
    /// Quantity still available (kg).
    pub quantity_remaining: Decimal,
    /// Price per kg recorded on the entry, if it was priced at receipt.
    pub unit_price: Option<Decimal>,
}

impl CostLayer {
    /// Whether the lot still has material to draw.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.quantity_remaining > Decimal::ZERO
    }

    fn validate(&self) -> Result<(), AllocationError> {
        let reason = if self.quantity_received <= Decimal::ZERO {
            Some("quantity received must be positive")
        } else if self.quantity_remaining < Decimal::ZERO {
            Some("quantity remaining is negative")
        } else if self.quantity_remaining > self.quantity_received {
            Some("quantity remaining exceeds quantity received")
        } else if self.unit_price.is_some_and(|p| p < Decimal::ZERO) {
            Some("unit price is negative")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(AllocationError::InvalidLayer {
                entry_number: self.entry_number.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// A request to consume material at a plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRequest {
    /// Material to consume.
    pub material_id: MaterialId,
    /// Plant the consumption happens at.
    pub plant_id: PlantId,
    /// Quantity to consume (kg), must be positive.
    pub quantity: Decimal,
    /// Date of consumption. Lots received after this date are not eligible.
    pub consumption_date: NaiveDate,
    /// Price-list price applied to lots that carry no unit price.
    pub fallback_unit_price: Option<Decimal>,
}

impl ConsumptionRequest {
    /// Create a request without a price-list fallback.
    #[must_use]
    pub const fn new(
        material_id: MaterialId,
        plant_id: PlantId,
        quantity: Decimal,
        consumption_date: NaiveDate,
    ) -> Self {
        Self {
            material_id,
            plant_id,
            quantity,
            consumption_date,
            fallback_unit_price: None,
        }
    }

    /// Attach a price-list fallback.
    #[must_use]
    pub const fn with_fallback_price(mut self, price: Option<Decimal>) -> Self {
        self.fallback_unit_price = price;
        self
    }
}

/// Where the unit price of an allocation line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// The lot's own unit price.
    Entry,
    /// The effective material price list (lot had no price).
    PriceList,
}

/// Quantity drawn from one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    /// Lot drawn from.
    pub entry_id: EntryId,
    /// Human-readable entry number.
    pub entry_number: String,
    /// Quantity drawn (kg), always positive.
    pub quantity: Decimal,
    /// Price per kg frozen at allocation time.
    pub unit_price: Decimal,
    /// `quantity × unit_price`, exact.
    pub cost: Decimal,
    /// Lot's remaining quantity after this draw (kg).
    pub remaining_after: Decimal,
    /// Origin of `unit_price`.
    pub price_source: PriceSource,
}

/// Outcome of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Material consumed.
    pub material_id: MaterialId,
    /// Plant consumed at.
    pub plant_id: PlantId,
    /// Total quantity consumed (equals the request).
    pub quantity: Decimal,
    /// Exact sum of line costs.
    pub total_cost: Decimal,
    /// Per-lot breakdown in FIFO order.
    pub allocations: Vec<AllocationLine>,
}

impl AllocationResult {
    /// Derived weighted unit cost (`total_cost / quantity`, 4 dp).
    #[must_use]
    pub fn weighted_unit_cost(&self) -> Decimal {
        weighted_unit_cost(self.total_cost, self.quantity)
    }
}

/// Select the lots eligible for a request, in FIFO order.
///
/// A lot is eligible when it belongs to the requested material and plant,
/// has remaining quantity, and was received on or before the consumption
/// date (UTC calendar date).
#[must_use]
pub fn eligible_layers<'a>(
    layers: &'a [CostLayer],
    request: &ConsumptionRequest,
) -> Vec<&'a CostLayer> {
    let mut eligible: Vec<&CostLayer> = layers
        .iter()
        .filter(|l| l.material_id == request.material_id && l.plant_id == request.plant_id)
        .filter(|l| l.is_available())
        .filter(|l| l.received_at.date_naive() <= request.consumption_date)
        .collect();

    eligible.sort_by(|a, b| {
        a.received_at
            .cmp(&b.received_at)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    eligible
}

/// Allocate a consumption across lots, oldest first.
///
/// # Errors
///
/// - [`AllocationError::InvalidQuantity`] if `request.quantity <= 0`
/// - [`AllocationError::InvalidLayer`] if an eligible lot breaks
///   `0 ≤ remaining ≤ received` or carries a negative price
/// - [`AllocationError::InsufficientInventory`] if the eligible lots hold
///   less than requested (nothing is allocated)
/// - [`AllocationError::MissingUnitPrice`] if a drawn lot has no price and
///   the request carries no fallback
/// - [`AllocationError::Overflow`] on decimal overflow
pub fn allocate(
    layers: &[CostLayer],
    request: &ConsumptionRequest,
) -> Result<AllocationResult, AllocationError> {
    if request.quantity <= Decimal::ZERO {
        return Err(AllocationError::InvalidQuantity(request.quantity));
    }

    let ordered = eligible_layers(layers, request);

    let mut available = Decimal::ZERO;
    for layer in &ordered {
        layer.validate()?;
        available = available
            .checked_add(layer.quantity_remaining)
            .ok_or_else(|| AllocationError::Overflow {
                entry_number: layer.entry_number.clone(),
            })?;
    }

    if available < request.quantity {
        return Err(AllocationError::InsufficientInventory {
            requested: request.quantity,
            available,
        });
    }

    let mut remaining_to_allocate = request.quantity;
    let mut total_cost = Decimal::ZERO;
    let mut allocations = Vec::new();

    for layer in ordered {
        if remaining_to_allocate.is_zero() {
            break;
        }

        let (unit_price, price_source) = match (layer.unit_price, request.fallback_unit_price) {
            (Some(price), _) => (price, PriceSource::Entry),
            (None, Some(price)) => (price, PriceSource::PriceList),
            (None, None) => {
                return Err(AllocationError::MissingUnitPrice {
                    entry_number: layer.entry_number.clone(),
                });
            }
        };

        let quantity = remaining_to_allocate.min(layer.quantity_remaining);
        let overflow = || AllocationError::Overflow {
            entry_number: layer.entry_number.clone(),
        };
        let cost = quantity.checked_mul(unit_price).ok_or_else(overflow)?;
        total_cost = total_cost.checked_add(cost).ok_or_else(overflow)?;
        remaining_to_allocate -= quantity;

        allocations.push(AllocationLine {
            entry_id: layer.entry_id,
            entry_number: layer.entry_number.clone(),
            quantity,
            unit_price,
            cost,
            remaining_after: layer.quantity_remaining - quantity,
            price_source,
        });
    }

    Ok(AllocationResult {
        material_id: request.material_id,
        plant_id: request.plant_id,
        quantity: request.quantity,
        total_cost,
        allocations,
    })
}
