//! Remaining-inventory valuation over cost layers.
//!
//! Value is `Σ quantity_remaining × unit_price` over every lot that still
//! holds material, each lot at its own price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fifo::{AllocationError, CostLayer};
use crate::types::EntryId;

/// Value of one undepleted lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerValuation {
    pub entry_id: EntryId,
    pub entry_number: String,
    pub quantity_remaining: Decimal,
    /// `None` when the lot was never priced; such a lot contributes zero value.
    pub unit_price: Option<Decimal>,
    pub layer_value: Decimal,
}

/// Valuation of one material at one plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Valuation {
    /// Exact total value of remaining stock.
    pub total_value: Decimal,
    /// Total remaining quantity (kg).
    pub total_quantity: Decimal,
    /// Remaining quantity held in unpriced lots (kg).
    pub unpriced_quantity: Decimal,
    /// Per-lot breakdown in FIFO order.
    pub layers: Vec<LayerValuation>,
}

/// Value a set of lots.
///
/// Exhausted lots are skipped. The breakdown is returned in FIFO order
/// (`received_at`, then entry ID), the order in which the lots will be drawn.
///
/// # Errors
///
/// Returns [`AllocationError::Overflow`] if a lot's value or a running total
/// exceeds the decimal range.
pub fn value_layers(layers: &[CostLayer]) -> Result<Valuation, AllocationError> {
    let mut available: Vec<&CostLayer> = layers.iter().filter(|l| l.is_available()).collect();
    available.sort_by(|a, b| {
        a.received_at
            .cmp(&b.received_at)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });

    let mut valuation = Valuation::default();
    for layer in available {
        let overflow = || AllocationError::Overflow {
            entry_number: layer.entry_number.clone(),
        };

        let layer_value = match layer.unit_price {
            Some(price) => layer
                .quantity_remaining
                .checked_mul(price)
                .ok_or_else(overflow)?,
            None => Decimal::ZERO,
        };

        valuation.total_value = valuation
            .total_value
            .checked_add(layer_value)
            .ok_or_else(overflow)?;
        valuation.total_quantity = valuation
            .total_quantity
            .checked_add(layer.quantity_remaining)
            .ok_or_else(overflow)?;
        if layer.unit_price.is_none() {
            valuation.unpriced_quantity = valuation
                .unpriced_quantity
                .checked_add(layer.quantity_remaining)
                .ok_or_else(overflow)?;
        }

        valuation.layers.push(LayerValuation {
            entry_id: layer.entry_id,
            entry_number: layer.entry_number.clone(),
            quantity_remaining: layer.quantity_remaining,
            unit_price: layer.unit_price,
            layer_value,
        });
    }
    Ok(valuation)
}
