mod common;

use {
    common::OrderSeed,
    paycore::{
        domain::{
            error::CoreError,
            order::{OrderStatus, PaymentStatus},
        },
        services::{
            bulk_actions::{
                CashbackDecision, MAX_BATCH, OrderAction, bulk_cashback_decision,
                bulk_order_action, mark_cashback_paid, pending_cashbacks,
            },
            cache::PendingCountCache,
            notify::Notifier,
        },
    },
    std::{sync::atomic::Ordering, time::Duration},
    uuid::Uuid,
};

async fn seed_placed(pool: &sqlx::PgPool) -> Uuid {
    common::seed_order(
        pool,
        OrderSeed {
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Pending,
            paid_amount: 0,
            ..Default::default()
        },
    )
    .await
}

#[tokio::test]
async fn confirm_applies_to_valid_orders_and_reports_the_rest() {
    let pool = require_pool!("paycore_test_bulk");

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(seed_placed(&pool).await);
    }
    let delivered = common::seed_order(
        &pool,
        OrderSeed {
            status: OrderStatus::Delivered,
            ..Default::default()
        },
    )
    .await;
    ids.push(delivered);

    let notifier = Notifier::disabled();
    let outcome = bulk_order_action(&pool, &notifier, &OrderAction::Confirm, &ids)
        .await
        .unwrap();

    assert_eq!(outcome.success, 4);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].id, delivered);

    // The invalid item is a skip, not a rollback: the other four commit.
    for id in &ids[..4] {
        assert_eq!(common::order_row(&pool, *id).await.status, "confirmed");
        assert!(
            common::timeline_statuses(&pool, *id)
                .await
                .contains(&"confirmed".to_string())
        );
    }
    assert_eq!(common::order_row(&pool, delivered).await.status, "delivered");
}

#[tokio::test]
async fn cancel_records_the_reason() {
    let pool = require_pool!("paycore_test_bulk");
    let id = seed_placed(&pool).await;

    let notifier = Notifier::disabled();
    let outcome = bulk_order_action(
        &pool,
        &notifier,
        &OrderAction::Cancel {
            reason: "out of stock".into(),
        },
        &[id],
    )
    .await
    .unwrap();
    assert_eq!(outcome.success, 1);

    let (status, reason): (String, Option<String>) = sqlx::query_as(
        "SELECT status, cancel_reason FROM orders WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "cancelled");
    assert_eq!(reason.as_deref(), Some("out of stock"));

    // Cancelled orders cannot be shipped afterwards.
    let outcome = bulk_order_action(&pool, &notifier, &OrderAction::MarkShipped, &[id])
        .await
        .unwrap();
    assert_eq!(outcome.failed, 1);
}

#[tokio::test]
async fn batch_limits_are_enforced_up_front() {
    let pool = require_pool!("paycore_test_bulk");

    let notifier = Notifier::disabled();
    let err = bulk_order_action(&pool, &notifier, &OrderAction::Confirm, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let too_many: Vec<Uuid> = (0..MAX_BATCH + 1).map(|_| Uuid::now_v7()).collect();
    let err = bulk_order_action(&pool, &notifier, &OrderAction::Confirm, &too_many)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn cancel_puts_the_items_back_in_stock() {
    let pool = require_pool!("paycore_test_bulk");
    let notifier = Notifier::disabled();

    let id = seed_placed(&pool).await;
    let plain = common::seed_product(&pool, 0, false).await;
    common::seed_item(&pool, id, plain, 2, 500, None).await;
    let varianted = common::seed_product(&pool, 4, true).await;
    common::seed_variant(&pool, varianted, "color", "red", 1).await;
    common::seed_item(&pool, id, varianted, 3, 800, Some(("color", "red"))).await;

    let outcome = bulk_order_action(
        &pool,
        &notifier,
        &OrderAction::Cancel {
            reason: "customer request".into(),
        },
        &[id],
    )
    .await
    .unwrap();
    assert_eq!(outcome.success, 1);

    // The plain line returns to aggregate stock and is sellable again.
    assert_eq!(common::product_stock(&pool, plain).await, 2);
    // The variant line returns to its bucket, not the aggregate.
    assert_eq!(common::variant_stock(&pool, varianted, "color", "red").await, 4);
    assert_eq!(common::product_stock(&pool, varianted).await, 4);
}

#[tokio::test]
async fn applied_orders_are_notified_after_commit() {
    let pool = require_pool!("paycore_test_bulk");
    let (sink_url, hits) = common::spawn_sink().await;
    let notifier = Notifier::new(reqwest::Client::new(), Some(sink_url));

    let ids = vec![
        seed_placed(&pool).await,
        seed_placed(&pool).await,
        common::seed_order(
            &pool,
            common::OrderSeed {
                status: OrderStatus::Delivered,
                ..Default::default()
            },
        )
        .await,
    ];

    let outcome = bulk_order_action(&pool, &notifier, &OrderAction::Confirm, &ids)
        .await
        .unwrap();
    assert_eq!(outcome.success, 2);

    // One message per applied order, none for the skipped one.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cashback_decisions_skip_already_decided_requests() {
    let pool = require_pool!("paycore_test_bulk");
    let cache = PendingCountCache::new(Duration::from_secs(60));
    let merchant = Uuid::now_v7();

    let a = common::seed_cashback(&pool, merchant, 500, "pending").await;
    let b = common::seed_cashback(&pool, merchant, 700, "pending").await;
    let rejected = common::seed_cashback(&pool, merchant, 900, "rejected").await;

    let outcome = bulk_cashback_decision(
        &pool,
        &cache,
        &CashbackDecision::Approve {
            amount: None,
            notes: Some("festival batch".into()),
        },
        &[a, b, rejected],
    )
    .await
    .unwrap();

    assert_eq!(outcome.success, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors[0].id, rejected);

    // Approved amount defaults to what was requested.
    let (status, approved): (String, Option<i64>) =
        sqlx::query_as("SELECT status, approved_amount FROM cashback_requests WHERE id = $1")
            .bind(a)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "approved");
    assert_eq!(approved, Some(500));
}

#[tokio::test]
async fn only_approved_requests_can_be_paid() {
    let pool = require_pool!("paycore_test_bulk");
    let gateways = common::test_gateways(&pool);
    let cache = PendingCountCache::new(Duration::from_secs(60));

    let pending = common::seed_cashback(&pool, Uuid::now_v7(), 500, "pending").await;
    let err = mark_cashback_paid(&pool, &gateways, &cache, pending)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidPaymentState(_)));

    let paid = common::seed_cashback(&pool, Uuid::now_v7(), 500, "paid").await;
    let err = mark_cashback_paid(&pool, &gateways, &cache, paid)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidPaymentState(_)));
}

#[tokio::test]
async fn pending_count_is_cached_and_invalidated_by_decisions() {
    let pool = require_pool!("paycore_test_bulk");
    let cache = PendingCountCache::new(Duration::from_secs(60));
    let merchant = Uuid::now_v7();

    let first_req = common::seed_cashback(&pool, merchant, 100, "pending").await;
    common::seed_cashback(&pool, merchant, 200, "pending").await;
    common::seed_cashback(&pool, merchant, 300, "pending").await;

    let first = pending_cashbacks(&pool, &cache, merchant).await.unwrap();
    assert_eq!(first.count, 3);
    assert!(!first.cached);

    let second = pending_cashbacks(&pool, &cache, merchant).await.unwrap();
    assert_eq!(second.count, 3);
    assert!(second.cached);

    // Deciding a request drops the cached value for that merchant.
    bulk_cashback_decision(
        &pool,
        &cache,
        &CashbackDecision::Reject { notes: None },
        &[first_req],
    )
    .await
    .unwrap();

    let third = pending_cashbacks(&pool, &cache, merchant).await.unwrap();
    assert_eq!(third.count, 2);
    assert!(!third.cached);
}
