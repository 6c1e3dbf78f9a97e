use {
    crate::domain::{
        error::CoreError,
        event::{GatewayEvent, PaymentEventKind},
        money::MoneyAmount,
        order::{NewTimelineEntry, Order, PaymentStatus},
    },
    crate::infra::postgres::{self, order_repo, refund_repo},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// Captures within one rupee of the order total are accepted as rounding.
const AMOUNT_TOLERANCE: i64 = 100;

/// Apply one normalized gateway event to the order it concerns. Each event
/// runs in its own transaction under the order's advisory lock, so two
/// deliveries touching the same order are serialized.
pub async fn apply(pool: &PgPool, event: &GatewayEvent) -> Result<(), CoreError> {
    match &event.kind {
        PaymentEventKind::Captured {
            order_id,
            payment_id,
            amount,
            occurred_at,
        } => {
            let Some(order_id) = order_ref(event, *order_id) else {
                return Ok(());
            };
            let paid_at = DateTime::from_timestamp(*occurred_at, 0).unwrap_or_else(Utc::now);
            apply_capture(pool, order_id, payment_id, *amount, paid_at).await
        }
        PaymentEventKind::Failed { order_id, reason } => {
            let Some(order_id) = order_ref(event, *order_id) else {
                return Ok(());
            };
            apply_failure(pool, order_id, reason).await
        }
        PaymentEventKind::Authorized { order_id } => {
            let Some(order_id) = order_ref(event, *order_id) else {
                return Ok(());
            };
            apply_authorization(pool, order_id).await
        }
        PaymentEventKind::OrderPaid { order_id } => {
            let Some(order_id) = order_ref(event, *order_id) else {
                return Ok(());
            };
            let mut tx = pool.begin().await?;
            postgres::lock_order(&mut tx, order_id).await?;
            order_repo::append_timeline(
                &mut *tx,
                order_id,
                &NewTimelineEntry::new("order_paid", "gateway confirmed the order as paid"),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        PaymentEventKind::RefundCreated {
            payment_id,
            refund_id,
            amount,
        } => apply_refund_created(pool, payment_id, refund_id, *amount).await,
        PaymentEventKind::RefundProcessed {
            payment_id,
            refund_id,
            amount,
        } => apply_refund_processed(pool, payment_id, refund_id, *amount).await,
        PaymentEventKind::RefundFailed {
            payment_id,
            refund_id,
            ..
        } => apply_refund_failed(pool, payment_id, refund_id).await,
        PaymentEventKind::Unknown => {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                "event type not handled, logged only"
            );
            Ok(())
        }
    }
}

/// An event that should carry an order reference but does not is a logged
/// no-op: the delivery is still acknowledged, nothing mutates.
fn order_ref(event: &GatewayEvent, order_id: Option<Uuid>) -> Option<Uuid> {
    if order_id.is_none() {
        tracing::warn!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "event carries no order reference, ignored"
        );
    }
    order_id
}

async fn load_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
) -> Result<Order, CoreError> {
    order_repo::get(&mut **tx, order_id)
        .await?
        .ok_or(CoreError::OrderNotFound)
}

async fn apply_capture(
    pool: &PgPool,
    order_id: Uuid,
    payment_id: &str,
    amount: MoneyAmount,
    paid_at: DateTime<Utc>,
) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    postgres::lock_order(&mut tx, order_id).await?;
    let order = load_order(&mut tx, order_id).await?;

    if order.payment_status == PaymentStatus::Paid {
        // Redelivered capture for an already-settled order, nothing to do.
        tracing::debug!(%order_id, %payment_id, "capture for already-paid order ignored");
        tx.commit().await?;
        return Ok(());
    }

    if !order.payment_status.can_transition_to(&PaymentStatus::Paid) {
        // A capture landing on a refunded order is an anomaly worth an
        // audit row, never a status regression.
        tracing::warn!(
            %order_id,
            current = %order.payment_status,
            "capture event for order in non-payable state"
        );
        order_repo::append_timeline(
            &mut *tx,
            order_id,
            &NewTimelineEntry::new("payment_anomaly", "capture received in non-payable state")
                .with_metadata(serde_json::json!({
                    "paymentId": payment_id,
                    "currentStatus": order.payment_status.as_str(),
                })),
        )
        .await?;
        tx.commit().await?;
        return Ok(());
    }

    // Rounding across the gateway can move the capture by up to one rupee;
    // anything beyond that is flagged for manual review, payment state stays.
    if (amount.minor_units() - order.total.minor_units()).abs() > AMOUNT_TOLERANCE {
        tracing::error!(
            %order_id,
            %payment_id,
            expected = order.total.minor_units(),
            received = amount.minor_units(),
            "captured amount differs from order total, flagged for review"
        );
        order_repo::append_timeline(
            &mut *tx,
            order_id,
            &NewTimelineEntry::new("amount_mismatch", "captured amount differs from order total")
                .with_metadata(serde_json::json!({
                    "paymentId": payment_id,
                    "capturedAmount": amount.minor_units(),
                    "orderTotal": order.total.minor_units(),
                })),
        )
        .await?;
        tx.commit().await?;
        return Ok(());
    }

    order_repo::record_capture(&mut *tx, order_id, payment_id, amount, paid_at).await?;
    order_repo::append_timeline(
        &mut *tx,
        order_id,
        &NewTimelineEntry::new("payment_captured", "payment captured by gateway").with_metadata(
            serde_json::json!({
                "paymentId": payment_id,
                "amount": amount.minor_units(),
            }),
        ),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn apply_failure(pool: &PgPool, order_id: Uuid, reason: &str) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    postgres::lock_order(&mut tx, order_id).await?;
    let order = load_order(&mut tx, order_id).await?;

    if !order.payment_status.can_transition_to(&PaymentStatus::Failed) {
        tracing::debug!(
            %order_id,
            current = %order.payment_status,
            "failure event ignored for settled order"
        );
        tx.commit().await?;
        return Ok(());
    }

    order_repo::mark_failed(&mut *tx, order_id).await?;
    order_repo::append_timeline(
        &mut *tx,
        order_id,
        &NewTimelineEntry::new("payment_failed", "payment attempt failed")
            .with_metadata(serde_json::json!({ "reason": reason })),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn apply_authorization(pool: &PgPool, order_id: Uuid) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    postgres::lock_order(&mut tx, order_id).await?;
    let order = load_order(&mut tx, order_id).await?;

    if order
        .payment_status
        .can_transition_to(&PaymentStatus::Processing)
    {
        order_repo::mark_processing(&mut *tx, order_id).await?;
        order_repo::append_timeline(
            &mut *tx,
            order_id,
            &NewTimelineEntry::new("payment_authorized", "payment authorized, awaiting capture"),
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Refund lifecycle events address the order through the gateway payment
/// reference stored as `transaction_id` at capture time.
async fn order_by_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment_id: &str,
) -> Result<Option<Order>, CoreError> {
    order_repo::get_by_transaction(&mut **tx, payment_id).await
}

async fn apply_refund_created(
    pool: &PgPool,
    payment_id: &str,
    refund_id: &str,
    amount: MoneyAmount,
) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    let Some(order) = order_by_payment(&mut tx, payment_id).await? else {
        tracing::warn!(%payment_id, %refund_id, "refund created for unknown payment");
        tx.commit().await?;
        return Ok(());
    };

    postgres::lock_order(&mut tx, order.id).await?;
    order_repo::append_timeline(
        &mut *tx,
        order.id,
        &NewTimelineEntry::new("refund_initiated", "gateway reported a refund in flight")
            .with_metadata(serde_json::json!({
                "refundId": refund_id,
                "amount": amount.minor_units(),
            })),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn apply_refund_processed(
    pool: &PgPool,
    payment_id: &str,
    refund_id: &str,
    amount: MoneyAmount,
) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    let Some(order) = order_by_payment(&mut tx, payment_id).await? else {
        tracing::warn!(%payment_id, %refund_id, "refund settled for unknown payment");
        tx.commit().await?;
        return Ok(());
    };
    postgres::lock_order(&mut tx, order.id).await?;

    if refund_repo::exists_by_gateway_id(&mut *tx, refund_id).await? {
        // Orchestrated refund settling: the order totals already moved when
        // the refund was raised, only the audit row and timestamps close out.
        refund_repo::mark_completed_by_gateway_id(&mut *tx, refund_id, "processed").await?;
        order_repo::mark_refund_settled(&mut *tx, order.id).await?;
    } else {
        // Refund raised at the gateway dashboard, not through this service:
        // reconcile the order totals from the event.
        order_repo::reconcile_refund(&mut *tx, order.id, refund_id, amount).await?;
    }

    order_repo::append_timeline(
        &mut *tx,
        order.id,
        &NewTimelineEntry::new("refund_processed", "gateway settled the refund").with_metadata(
            serde_json::json!({
                "refundId": refund_id,
                "amount": amount.minor_units(),
            }),
        ),
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn apply_refund_failed(
    pool: &PgPool,
    payment_id: &str,
    refund_id: &str,
) -> Result<(), CoreError> {
    let mut tx = pool.begin().await?;
    refund_repo::mark_failed_by_gateway_id(&mut *tx, refund_id, "failed").await?;

    if let Some(order) = order_by_payment(&mut tx, payment_id).await? {
        postgres::lock_order(&mut tx, order.id).await?;
        order_repo::append_timeline(
            &mut *tx,
            order.id,
            &NewTimelineEntry::new("refund_failed", "gateway could not process the refund")
                .with_metadata(serde_json::json!({ "refundId": refund_id })),
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
