//! Property-based tests for FIFO allocation invariants
//!
//! These tests use proptest to verify:
//! - Conservation: Σ(allocated) == requested, exactly
//! - Monotonic depletion: remaining == received − Σ(draws), never negative
//! - FIFO order: a lot is only touched once every older lot is empty
//! - Determinism: shuffled input yields an identical result
//! - All-or-nothing: over-requests fail without a partial result

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use concreto_core::{
    AllocationError, ConsumptionRequest, CostLayer, EntryId, MaterialId, PlantId, allocate,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const MATERIAL: MaterialId = MaterialId::new(1);
const PLANT: PlantId = PlantId::new(1);

fn consumption_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()
}

/// Strategy for quantities in grams, expressed as kg with 3 decimals
fn kg_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..5_000_000i64).prop_map(|grams| Decimal::new(grams, 3))
}

/// Strategy for unit prices with 4 decimals
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|p| Decimal::new(p, 4))
}

/// Strategy for a set of lots; receipt offsets may collide to exercise tie-breaking
fn layers_strategy() -> impl Strategy<Value = Vec<CostLayer>> {
    prop::collection::vec((kg_strategy(), price_strategy(), 0i64..20i64), 1..12).prop_map(
        |specs| {
            let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (qty, price, offset_hours))| {
                    let id = i32::try_from(i).unwrap() + 1;
                    CostLayer {
                        entry_id: EntryId::new(id),
                        entry_number: format!("ENT-20260101-{id:03}"),
                        material_id: MATERIAL,
                        plant_id: PLANT,
                        received_at: base + Duration::hours(offset_hours),
                        quantity_received: qty,
                        quantity_remaining: qty,
                        unit_price: Some(price),
                    }
                })
                .collect()
        },
    )
}

fn total_remaining(layers: &[CostLayer]) -> Decimal {
    layers.iter().map(|l| l.quantity_remaining).sum()
}

fn request(quantity: Decimal) -> ConsumptionRequest {
    ConsumptionRequest::new(MATERIAL, PLANT, quantity, consumption_date())
}

/// Apply an allocation's depletions to a snapshot (what the database update does)
fn apply(layers: &mut [CostLayer], result: &concreto_core::AllocationResult) {
    for line in &result.allocations {
        let layer = layers.iter_mut().find(|l| l.entry_id == line.entry_id).unwrap();
        layer.quantity_remaining -= line.quantity;
    }
}

proptest! {
    #[test]
    fn prop_conservation(layers in layers_strategy(), fraction in 1u32..=100u32) {
        let available = total_remaining(&layers);
        let requested = (available * Decimal::from(fraction) / Decimal::from(100u32)).round_dp(3);
        prop_assume!(requested > Decimal::ZERO);

        let result = allocate(&layers, &request(requested)).unwrap();

        let drawn: Decimal = result.allocations.iter().map(|a| a.quantity).sum();
        prop_assert_eq!(drawn, requested);
        prop_assert_eq!(result.quantity, requested);

        let cost: Decimal = result.allocations.iter().map(|a| a.cost).sum();
        prop_assert_eq!(cost, result.total_cost);
        for line in &result.allocations {
            prop_assert!(line.quantity > Decimal::ZERO);
            prop_assert_eq!(line.cost, line.quantity * line.unit_price);
        }
    }

    #[test]
    fn prop_fifo_order(layers in layers_strategy(), fraction in 1u32..=100u32) {
        let available = total_remaining(&layers);
        let requested = (available * Decimal::from(fraction) / Decimal::from(100u32)).round_dp(3);
        prop_assume!(requested > Decimal::ZERO);

        let result = allocate(&layers, &request(requested)).unwrap();

        // Every line but the last must fully drain its lot
        let (last, earlier) = result.allocations.split_last().unwrap();
        for line in earlier {
            prop_assert_eq!(line.remaining_after, Decimal::ZERO);
        }
        prop_assert!(last.remaining_after >= Decimal::ZERO);

        // Drawn lots appear in (received_at, entry_id) order
        let by_id: HashMap<EntryId, &CostLayer> = layers.iter().map(|l| (l.entry_id, l)).collect();
        let keys: Vec<_> = result
            .allocations
            .iter()
            .map(|a| (by_id[&a.entry_id].received_at, a.entry_id))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);

        // No undrawn lot is older than the last drawn lot
        let (last_at, last_id) = (by_id[&last.entry_id].received_at, last.entry_id);
        for layer in &layers {
            if !result.allocations.iter().any(|a| a.entry_id == layer.entry_id) {
                prop_assert!((layer.received_at, layer.entry_id) > (last_at, last_id));
            }
        }
    }

    #[test]
    fn prop_monotonic_depletion(
        layers in layers_strategy(),
        draws in prop::collection::vec(kg_strategy(), 1..8),
    ) {
        let mut state = layers.clone();
        let mut drawn_per_lot: HashMap<EntryId, Decimal> = HashMap::new();

        for qty in draws {
            let before = state.clone();
            match allocate(&state, &request(qty)) {
                Ok(result) => {
                    for line in &result.allocations {
                        *drawn_per_lot.entry(line.entry_id).or_default() += line.quantity;
                    }
                    apply(&mut state, &result);
                }
                Err(AllocationError::InsufficientInventory { available, .. }) => {
                    prop_assert_eq!(available, total_remaining(&state));
                    prop_assert_eq!(&state, &before);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }

            for (current, previous) in state.iter().zip(&before) {
                prop_assert!(current.quantity_remaining <= previous.quantity_remaining);
                prop_assert!(current.quantity_remaining >= Decimal::ZERO);
            }
        }

        for layer in &state {
            let drawn = drawn_per_lot.get(&layer.entry_id).copied().unwrap_or_default();
            prop_assert_eq!(layer.quantity_remaining, layer.quantity_received - drawn);
        }
    }

    #[test]
    fn prop_determinism(layers in layers_strategy(), fraction in 1u32..=100u32) {
        let available = total_remaining(&layers);
        let requested = (available * Decimal::from(fraction) / Decimal::from(100u32)).round_dp(3);
        prop_assume!(requested > Decimal::ZERO);

        let mut reversed = layers.clone();
        reversed.reverse();

        let a = allocate(&layers, &request(requested)).unwrap();
        let b = allocate(&reversed, &request(requested)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_over_request_is_all_or_nothing(layers in layers_strategy(), extra in kg_strategy()) {
        let available = total_remaining(&layers);

        let err = allocate(&layers, &request(available + extra)).unwrap_err();

        prop_assert_eq!(
            err,
            AllocationError::InsufficientInventory {
                requested: available + extra,
                available,
            }
        );
    }

    #[test]
    fn prop_exact_exhaustion(layers in layers_strategy()) {
        let available = total_remaining(&layers);

        let result = allocate(&layers, &request(available)).unwrap();

        prop_assert_eq!(result.allocations.len(), layers.len());
        prop_assert!(result.allocations.iter().all(|a| a.remaining_after.is_zero()));
    }
}
