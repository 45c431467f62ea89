//! Decimal money helpers.
//!
//! Quantities (kg) and prices are carried as exact [`Decimal`] values
//! throughout the engine. Rounding only happens at presentation and
//! write-back boundaries, through the helpers here, so every caller rounds
//! the same way.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used when presenting a currency amount.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places used for a derived per-kg unit cost.
pub const UNIT_COST_SCALE: u32 = 4;

/// Storage of a quantity in kg: `NUMERIC(18, 3)`.
pub const QUANTITY_PRECISION: u32 = 18;
pub const QUANTITY_SCALE: u32 = 3;

/// Storage of a unit price: `NUMERIC(18, 4)`.
pub const PRICE_PRECISION: u32 = 18;
pub const PRICE_SCALE: u32 = 4;

/// Round a currency amount for display (2 dp, half away from zero).
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a per-unit cost (4 dp, half away from zero).
#[must_use]
pub fn round_unit_cost(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Weighted average unit cost of a consumption: `total_cost / quantity`,
/// rounded with [`round_unit_cost`].
///
/// Returns zero for a zero quantity. This is a derived display value only;
/// the ledger never prices anything at the weighted average.
#[must_use]
pub fn weighted_unit_cost(total_cost: Decimal, quantity: Decimal) -> Decimal {
    if quantity.is_zero() {
        return Decimal::ZERO;
    }
    total_cost
        .checked_div(quantity)
        .map_or(Decimal::ZERO, round_unit_cost)
}

/// Whether a `NUMERIC(precision, scale)` column stores `value` exactly.
///
/// False when the value carries more decimal places than `scale` (the
/// database would round it) or more integer digits than
/// `precision - scale` (the database would reject it).
#[must_use]
pub fn fits_numeric(value: Decimal, precision: u32, scale: u32) -> bool {
    let value = value.normalize();
    if value.scale() > scale {
        return false;
    }
    let limit = 10_i128
        .checked_pow(precision.saturating_sub(scale))
        .and_then(|l| Decimal::try_from_i128_with_scale(l, 0).ok());
    limit.is_none_or(|limit| value.abs().trunc() < limit)
}

/// Whether a quantity is stored without rounding.
#[must_use]
pub fn is_storable_quantity(quantity: Decimal) -> bool {
    fits_numeric(quantity, QUANTITY_PRECISION, QUANTITY_SCALE)
}

/// Whether a unit price is stored without rounding.
#[must_use]
pub fn is_storable_price(price: Decimal) -> bool {
    fits_numeric(price, PRICE_PRECISION, PRICE_SCALE)
}

/// Sum of `values`, or `None` if the total overflows.
#[must_use]
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, v| total.checked_add(v))
}
