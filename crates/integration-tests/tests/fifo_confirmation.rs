//! Database integration tests for remision confirmation and valuation.
//!
//! These tests require a `PostgreSQL` database in `TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p concreto-integration-tests -- --ignored

use std::time::Duration;

use rust_decimal::Decimal;

use concreto_core::{PriceSource, UserId};
use concreto_costing::CostingError;
use concreto_costing::ErrorKind;
use concreto_costing::config::ConfirmationConfig;
use concreto_costing::db::{
    AllocationRepository, EntryRepository, RemisionRepository, RepositoryError,
};
use concreto_costing::models::{
    CreateEntryInput, CreateRemisionInput, EntryFilter, RemisionLineInput,
};
use concreto_integration_tests::{TestContext, dec, jan, jan_date};

const ACTOR: UserId = UserId::new(7);

// =============================================================================
// FIFO ordering and valuation
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_fifo_draws_oldest_lot_first() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let e1 = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let e2 = ctx.receive(cement, 100, Some(Decimal::from(12)), 2).await;
    let (remision, lines) = ctx.remision(3, &[(cement, Decimal::from(150))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("confirmation should succeed");

    assert!(outcome.success);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.allocations_created, 2);
    assert_eq!(outcome.total_cost, Decimal::from(1600));

    let draws = &outcome.lines[0].allocations;
    assert_eq!(draws[0].entry_id, e1.id);
    assert_eq!(draws[0].quantity, Decimal::from(100));
    assert_eq!(draws[0].unit_price, Decimal::from(10));
    assert_eq!(draws[1].entry_id, e2.id);
    assert_eq!(draws[1].quantity, Decimal::from(50));
    assert_eq!(draws[1].unit_price, Decimal::from(12));

    assert!(ctx.entry(e1.id).await.quantity_remaining.is_zero());
    assert_eq!(ctx.entry(e2.id).await.quantity_remaining, Decimal::from(50));

    // Line cost is written back onto the remision line
    let line = RemisionRepository::new(ctx.state.pool())
        .get_line(lines[0].id)
        .await
        .expect("query")
        .expect("line exists");
    assert_eq!(line.total_cost_fifo, Some(Decimal::from(1600)));
    assert_eq!(line.unit_cost_weighted, Some(dec("10.6667")));
    assert!(line.fifo_allocated_at.is_some());

    let stored = RemisionRepository::new(ctx.state.pool())
        .get_remision(remision.id)
        .await
        .expect("query")
        .expect("remision exists");
    assert!(stored.is_confirmed());
    assert_eq!(stored.fifo_confirmed_by, Some(ACTOR));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_valuation_after_fifo_draw() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let e2 = ctx.receive(cement, 100, Some(Decimal::from(12)), 2).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(150))]).await;

    ctx.state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("confirmation should succeed");

    let report = ctx
        .state
        .valuations()
        .get_valuation(cement, ctx.plant_id)
        .await
        .expect("valuation");

    assert_eq!(report.valuation.total_value, Decimal::from(600));
    assert_eq!(report.valuation.total_quantity, Decimal::from(50));
    assert_eq!(report.valuation.layers.len(), 1);
    assert_eq!(report.valuation.layers[0].entry_id, e2.id);
    assert_eq!(report.valuation.layers[0].unit_price, Some(Decimal::from(12)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_same_timestamp_breaks_ties_by_entry_id() {
    let ctx = TestContext::new().await;
    let sand = ctx.material("sand").await;
    let first = ctx
        .receive_at(sand, Decimal::from(10), Some(Decimal::from(1)), jan(1, 8))
        .await;
    let second = ctx
        .receive_at(sand, Decimal::from(10), Some(Decimal::from(2)), jan(1, 8))
        .await;
    let (remision, _) = ctx.remision(2, &[(sand, Decimal::from(15))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("confirmation should succeed");

    let draws = &outcome.lines[0].allocations;
    assert_eq!(draws[0].entry_id, first.id);
    assert_eq!(draws[0].quantity, Decimal::from(10));
    assert_eq!(draws[1].entry_id, second.id);
    assert_eq!(draws[1].quantity, Decimal::from(5));
    assert_eq!(outcome.total_cost, Decimal::from(20));
}

// =============================================================================
// Exhaustion and failure
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_exact_exhaustion_empties_every_lot() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let e1 = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let e2 = ctx.receive(cement, 50, Some(Decimal::from(12)), 2).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(150))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("confirmation should succeed");

    assert!(outcome.success);
    assert!(ctx.entry(e1.id).await.is_exhausted());
    assert!(ctx.entry(e2.id).await.is_exhausted());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_one_unit_over_fails_and_changes_nothing() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let e1 = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let e2 = ctx.receive(cement, 50, Some(Decimal::from(12)), 2).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(151))]).await;

    let before = (ctx.entry(e1.id).await, ctx.entry(e2.id).await);

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("a failed line is reported, not raised");

    assert!(!outcome.success);
    assert_eq!(outcome.allocations_created, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, ErrorKind::InsufficientInventory);

    let after = (ctx.entry(e1.id).await, ctx.entry(e2.id).await);
    assert_eq!(before, after);
    assert_eq!(ctx.allocation_count().await, 0);

    let stored = RemisionRepository::new(ctx.state.pool())
        .get_remision(remision.id)
        .await
        .expect("query")
        .expect("remision exists");
    assert!(!stored.is_confirmed());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_failed_confirmation_can_be_retried_after_restock() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(120))]).await;

    let first = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");
    assert!(!first.success);

    ctx.receive(cement, 50, Some(Decimal::from(11)), 2).await;

    let second = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");
    assert!(second.success);
    assert_eq!(second.total_cost, Decimal::from(1220));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_remision_is_all_or_nothing() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let gravel = ctx.material("gravel").await;
    let cement_lot = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    ctx.receive(gravel, 10, Some(Decimal::from(2)), 1).await;
    let (remision, lines) = ctx
        .remision(
            3,
            &[(cement, Decimal::from(40)), (gravel, Decimal::from(25))],
        )
        .await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    assert!(!outcome.success);
    assert_eq!(outcome.allocations_created, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].remision_line_id, lines[1].id);

    // The cement line fit, but nothing of it was kept
    assert_eq!(ctx.entry(cement_lot.id).await.quantity_remaining, Decimal::from(100));
    assert_eq!(ctx.allocation_count().await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_reconfirmation_is_rejected() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let lot = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(30))]).await;

    ctx.state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("first confirmation succeeds");

    let err = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect_err("second confirmation must be rejected");

    assert!(matches!(err, CostingError::AlreadyConfirmed(id) if id == remision.id));
    assert_eq!(ctx.entry(lot.id).await.quantity_remaining, Decimal::from(70));
    assert_eq!(ctx.allocation_count().await, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_concurrent_confirmations_never_overdraw_a_lot() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let lot = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (r1, _) = ctx.remision(3, &[(cement, Decimal::from(60))]).await;
    let (r2, _) = ctx.remision(3, &[(cement, Decimal::from(60))]).await;

    let config = ConfirmationConfig {
        lock_timeout: Duration::from_secs(10),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(20),
    };
    let a = ctx.confirmations_with(config);
    let b = ctx.confirmations_with(config);

    let (first, second) = tokio::join!(
        a.confirm_remision(r1.id, ACTOR),
        b.confirm_remision(r2.id, ACTOR)
    );

    let outcomes = [first, second];
    let successes = outcomes
        .iter()
        .filter(|o| o.as_ref().is_ok_and(|o| o.success))
        .count();
    assert_eq!(successes, 1, "exactly one remision gets the lot: {outcomes:?}");

    let loser = outcomes
        .iter()
        .find(|o| !o.as_ref().is_ok_and(|o| o.success))
        .expect("one confirmation lost");
    match loser {
        Ok(outcome) => {
            assert_eq!(outcome.allocations_created, 0);
            assert_eq!(outcome.errors[0].kind, ErrorKind::InsufficientInventory);
        }
        Err(e) => assert_eq!(e.kind(), ErrorKind::ConcurrentModification),
    }

    assert_eq!(ctx.entry(lot.id).await.quantity_remaining, Decimal::from(40));
    let consumed = AllocationRepository::new(ctx.state.pool())
        .total_consumed_for_entry(lot.id)
        .await
        .expect("sum");
    assert_eq!(consumed, Decimal::from(60));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_remaining_equals_received_minus_ledger() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let lots = [
        ctx.receive(cement, 80, Some(Decimal::from(10)), 1).await,
        ctx.receive(cement, 45, Some(Decimal::from(11)), 2).await,
        ctx.receive(cement, 120, Some(Decimal::from(9)), 3).await,
    ];

    for quantity in ["33.5", "50", "12.25", "70"] {
        let (remision, _) = ctx.remision(5, &[(cement, dec(quantity))]).await;
        let outcome = ctx
            .state
            .confirmations()
            .confirm_remision(remision.id, ACTOR)
            .await
            .expect("reported outcome");
        assert!(outcome.success);
    }

    let ledger = AllocationRepository::new(ctx.state.pool());
    let mut total_consumed = Decimal::ZERO;
    for lot in &lots {
        let current = ctx.entry(lot.id).await;
        let consumed = ledger
            .total_consumed_for_entry(lot.id)
            .await
            .expect("sum");
        assert!(current.quantity_remaining >= Decimal::ZERO);
        assert_eq!(current.quantity_received - current.quantity_remaining, consumed);
        total_consumed += consumed;
    }
    assert_eq!(total_consumed, dec("165.75"));
}

// =============================================================================
// Consumption date and pricing
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_lots_received_after_consumption_date_are_ineligible() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    ctx.receive(cement, 40, Some(Decimal::from(10)), 1).await;
    let late = ctx.receive(cement, 100, Some(Decimal::from(12)), 5).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(50))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    assert!(!outcome.success);
    assert_eq!(outcome.errors[0].kind, ErrorKind::InsufficientInventory);
    assert_eq!(ctx.entry(late.id).await.quantity_remaining, Decimal::from(100));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_unpriced_lot_uses_price_list() {
    let ctx = TestContext::new().await;
    let sand = ctx.material("sand").await;
    ctx.price(sand, dec("0.30"), jan_date(1)).await;
    ctx.price(sand, dec("0.35"), jan_date(2)).await;
    ctx.receive(sand, 1000, None, 1).await;
    let (remision, lines) = ctx.remision(3, &[(sand, dec("820.5"))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    assert!(outcome.success);
    let draw = &outcome.lines[0].allocations[0];
    assert_eq!(draw.price_source, PriceSource::PriceList);
    assert_eq!(draw.unit_price, dec("0.35"));
    assert_eq!(outcome.total_cost, dec("287.175"));

    let cost = ctx
        .state
        .cost_reports()
        .line_cost(lines[0].id)
        .await
        .expect("line cost");
    assert_eq!(cost.total_cost, dec("287.175"));
    assert_eq!(
        cost.allocations[0].allocation.price_source,
        PriceSource::PriceList
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_unpriced_lot_without_price_list_fails() {
    let ctx = TestContext::new().await;
    let additive = ctx.material("additive").await;
    ctx.receive(additive, 20, None, 1).await;
    let (remision, _) = ctx.remision(3, &[(additive, Decimal::from(5))]).await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    assert!(!outcome.success);
    assert_eq!(outcome.errors[0].kind, ErrorKind::MissingUnitPrice);
}

// =============================================================================
// Lines, reports and receipts
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_zero_quantity_lines_are_skipped() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let water = ctx.material("water").await;
    ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (remision, _) = ctx
        .remision(3, &[(cement, Decimal::from(10)), (water, Decimal::ZERO)])
        .await;

    let outcome = ctx
        .state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    assert!(outcome.success);
    assert_eq!(outcome.lines.len(), 1);
    assert_eq!(outcome.allocations_created, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_remision_cost_report_matches_ledger() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let gravel = ctx.material("gravel").await;
    ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    ctx.receive(cement, 100, Some(Decimal::from(12)), 2).await;
    ctx.receive(gravel, 500, Some(dec("0.8")), 1).await;
    let (remision, lines) = ctx
        .remision(
            3,
            &[(cement, Decimal::from(150)), (gravel, Decimal::from(300))],
        )
        .await;

    ctx.state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    let report = ctx
        .state
        .cost_reports()
        .remision_cost(remision.id)
        .await
        .expect("remision cost");

    assert_eq!(report.lines.len(), 2);
    assert_eq!(report.lines[0].remision_line_id, lines[0].id);
    assert_eq!(report.lines[0].total_cost, Decimal::from(1600));
    assert_eq!(report.lines[0].allocations.len(), 2);
    assert_eq!(report.lines[1].total_cost, Decimal::from(240));
    assert_eq!(report.total_cost, Decimal::from(1840));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_entry_numbers_sequence_per_plant_and_day() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let a = ctx.receive_at(cement, Decimal::ONE, None, jan(4, 7)).await;
    let b = ctx.receive_at(cement, Decimal::ONE, None, jan(4, 15)).await;
    let c = ctx.receive_at(cement, Decimal::ONE, None, jan(5, 7)).await;

    assert_eq!(a.entry_number, "ENT-20260104-001");
    assert_eq!(b.entry_number, "ENT-20260104-002");
    assert_eq!(c.entry_number, "ENT-20260105-001");
    assert_eq!(a.quantity_remaining, a.quantity_received);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_receipt_with_extra_decimals_is_rejected() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;

    let err = ctx
        .state
        .receiving()
        .record_entry(&CreateEntryInput {
            material_id: cement,
            plant_id: ctx.plant_id,
            quantity_received: dec("10.0005"),
            unit_price: Some(dec("1.23456")),
            received_at: jan(1, 8),
            entered_by: None,
        })
        .await
        .expect_err("quantity would be rounded");

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let stored = EntryRepository::new(ctx.state.pool())
        .list_entries(&EntryFilter {
            material_id: cement,
            plant_id: ctx.plant_id,
            only_available: false,
            limit: None,
        })
        .await
        .expect("list entries");
    assert!(stored.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_line_quantity_below_stored_precision_is_rejected() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let lot = ctx.receive(cement, 10, Some(Decimal::from(10)), 1).await;

    let err = RemisionRepository::new(ctx.state.pool())
        .create_remision(&CreateRemisionInput {
            remision_number: format!("R-PRECISION-{}", ctx.plant_id),
            plant_id: ctx.plant_id,
            consumption_date: jan_date(3),
            lines: vec![RemisionLineInput {
                material_id: cement,
                quantity_kg: dec("0.0004"),
            }],
        })
        .await
        .expect_err("line would be stored as zero");

    assert!(matches!(err, RepositoryError::InvalidInput(_)));
    assert_eq!(ctx.entry(lot.id).await.quantity_remaining, Decimal::from(10));
    assert_eq!(ctx.allocation_count().await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_listing_without_limit_returns_every_lot() {
    let ctx = TestContext::new().await;
    let sand = ctx.material("sand").await;
    for _ in 0..501 {
        ctx.receive(sand, 1, Some(Decimal::ONE), 1).await;
    }
    let entries = EntryRepository::new(ctx.state.pool());
    let filter = |limit| EntryFilter {
        material_id: sand,
        plant_id: ctx.plant_id,
        only_available: true,
        limit,
    };

    let all = entries.list_entries(&filter(None)).await.expect("list entries");
    let page = entries.list_entries(&filter(Some(10))).await.expect("list entries");

    assert_eq!(all.len(), 501);
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].id, all[0].id);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_unknown_material_is_invalid_input() {
    let ctx = TestContext::new().await;

    let err = ctx
        .state
        .valuations()
        .get_valuation(concreto_core::MaterialId::new(-1), ctx.plant_id)
        .await
        .expect_err("unknown material");

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_missing_remision_is_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx
        .state
        .confirmations()
        .confirm_remision(concreto_core::RemisionId::new(-1), ACTOR)
        .await
        .expect_err("missing remision");

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Ledger guards
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_allocation_ledger_is_append_only() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(10))]).await;
    ctx.state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    let update = sqlx::query(
        "UPDATE inventory.material_consumption_allocation SET unit_price = 0 WHERE remision_id = $1",
    )
    .bind(remision.id)
    .execute(ctx.state.pool())
    .await;
    assert!(update.is_err());

    let delete =
        sqlx::query("DELETE FROM inventory.material_consumption_allocation WHERE remision_id = $1")
            .bind(remision.id)
            .execute(ctx.state.pool())
            .await;
    assert!(delete.is_err());
    assert_eq!(ctx.allocation_count().await, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (TEST_DATABASE_URL)"]
async fn test_lot_remaining_can_only_decrease() {
    let ctx = TestContext::new().await;
    let cement = ctx.material("cement").await;
    let lot = ctx.receive(cement, 100, Some(Decimal::from(10)), 1).await;
    let (remision, _) = ctx.remision(3, &[(cement, Decimal::from(30))]).await;
    ctx.state
        .confirmations()
        .confirm_remision(remision.id, ACTOR)
        .await
        .expect("reported outcome");

    let restock = sqlx::query(
        "UPDATE inventory.material_entry SET quantity_remaining = quantity_received WHERE id = $1",
    )
    .bind(lot.id)
    .execute(ctx.state.pool())
    .await;
    assert!(restock.is_err());

    let reprice = sqlx::query("UPDATE inventory.material_entry SET unit_price = 1 WHERE id = $1")
        .bind(lot.id)
        .execute(ctx.state.pool())
        .await;
    assert!(reprice.is_err());

    assert_eq!(ctx.entry(lot.id).await.quantity_remaining, Decimal::from(70));
}
