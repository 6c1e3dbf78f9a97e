use {
    crate::domain::{
        error::CoreError,
        gateway::{GatewayRefundRequest, GatewayRegistry},
        money::MoneyAmount,
        order::{NewTimelineEntry, Order, OrderItem, PaymentMethod, PaymentStatus},
        refund::{NewRefund, RefundStatus, RefundType, RefundedItem, estimated_arrival},
    },
    crate::infra::postgres::{self, inventory_repo, order_repo, refund_repo},
    crate::services::notify::{AdminRefundAlert, Notifier, RefundNotification},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub order_id: Uuid,
    /// None refunds the full remaining refundable balance.
    pub amount: Option<MoneyAmount>,
    pub reason: String,
    /// Explicit line items to put back in stock. None restores everything,
    /// but only when the refund exhausts the balance.
    pub refund_items: Option<Vec<RefundItemRequest>>,
    pub notify_customer: bool,
}

#[derive(Debug, Clone)]
pub struct RefundItemRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: Uuid,
    pub gateway_refund_id: String,
    pub status: RefundStatus,
    pub amount: MoneyAmount,
    pub refund_type: RefundType,
    pub payment_method: PaymentMethod,
    pub estimated_arrival: DateTime<Utc>,
    pub remaining_refundable: MoneyAmount,
}

/// Run one refund end to end: eligibility, gateway call, then the local
/// bookkeeping in a single transaction under the order's advisory lock.
///
/// The gateway call happens before the transaction — holding a lock across
/// an external HTTP call would stall every other event for the order. The
/// eligibility check is re-run inside the transaction, and the totals
/// update re-asserts the balance in its WHERE clause, so a concurrent
/// refund cannot overdraw what was paid.
pub async fn refund_order(
    pool: &PgPool,
    gateways: &GatewayRegistry,
    notifier: &Notifier,
    req: RefundRequest,
) -> Result<RefundReceipt, CoreError> {
    let order = order_repo::get(pool, req.order_id)
        .await?
        .ok_or(CoreError::OrderNotFound)?;

    let amount = req.amount.unwrap_or_else(|| order.refundable());
    order.check_refund_eligibility(amount)?;

    let adapter = gateways.for_method(order.payment_method);
    let gateway = adapter
        .create_refund(GatewayRefundRequest {
            order_id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            transaction_id: order.transaction_id.clone(),
            amount,
            currency: order.currency,
            reason: req.reason.clone(),
        })
        .await?;
    let status = adapter.map_refund_status(&gateway.gateway_status);

    let mut tx = pool.begin().await?;
    postgres::lock_order(&mut tx, order.id).await?;

    // The pre-check ran on a stale read; redo it on the locked row.
    let order = order_repo::get(&mut *tx, req.order_id)
        .await?
        .ok_or(CoreError::OrderNotFound)?;
    let refund_type = order.check_refund_eligibility(amount)?;

    let new_total = order
        .refund_amount
        .checked_add(amount)
        .ok_or(CoreError::InvalidAmount)?;
    // Status follows the money, not the classification: a second partial
    // that exhausts the balance leaves the order fully refunded.
    let exhausted = new_total == order.paid_amount;
    let new_status = if exhausted {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::PartiallyRefunded
    };

    if !order_repo::apply_refund(
        &mut *tx,
        order.id,
        amount,
        new_status,
        &gateway.gateway_refund_id,
        exhausted,
    )
    .await?
    {
        return Err(CoreError::InsufficientRefundable {
            requested: amount,
            available: order.refundable(),
        });
    }

    let items = order_repo::items(&mut *tx, order.id).await?;
    let refunded_items = match req.refund_items.as_deref() {
        Some(lines) if !lines.is_empty() => restore_lines(&mut tx, &items, lines).await?,
        _ if exhausted => {
            for item in &items {
                inventory_repo::restore_for_item(&mut *tx, item).await?;
            }
            // An empty breakdown reads as a whole-order refund in the audit row.
            Vec::new()
        }
        _ => Vec::new(),
    };

    let now = Utc::now();
    let refund = NewRefund {
        id: Uuid::now_v7(),
        order_id: order.id,
        user_id: order.user_id,
        order_number: order.order_number.clone(),
        payment_method: order.payment_method,
        refund_amount: amount,
        refund_type,
        refund_reason: req.reason.clone(),
        gateway_refund_id: gateway.gateway_refund_id.clone(),
        gateway_status: gateway.gateway_status.clone(),
        status,
        refunded_items,
        requested_at: now,
        estimated_arrival: estimated_arrival(order.payment_method, now),
    };
    refund_repo::insert(&mut *tx, &refund).await?;

    order_repo::append_timeline(
        &mut *tx,
        order.id,
        &NewTimelineEntry::new("refund_raised", format!("refund raised: {}", req.reason))
            .with_metadata(serde_json::json!({
                "refundId": refund.id,
                "gatewayRefundId": gateway.gateway_refund_id,
                "amount": amount.minor_units(),
                "refundType": refund_type.as_str(),
            })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        refund_id = %refund.id,
        amount = amount.minor_units(),
        refund_type = %refund_type,
        method = %order.payment_method,
        "refund recorded"
    );

    // COD has no gateway to move the money: someone has to do it by hand.
    if order.payment_method == PaymentMethod::Cod {
        notifier
            .manual_refund_required(&AdminRefundAlert {
                refund_id: refund.id,
                order_number: order.order_number.clone(),
                amount,
                reason: req.reason.clone(),
            })
            .await;
    }

    if req.notify_customer {
        let receipt = notifier
            .refund_initiated(&RefundNotification {
                refund_id: refund.id,
                order_number: order.order_number.clone(),
                user_id: order.user_id,
                amount,
                payment_method: order.payment_method,
                status,
                estimated_arrival: refund.estimated_arrival,
            })
            .await;
        if receipt.sms_sent || receipt.email_sent {
            refund_repo::mark_notified(pool, refund.id, receipt.sms_sent, receipt.email_sent)
                .await?;
        }
    }

    Ok(RefundReceipt {
        refund_id: refund.id,
        gateway_refund_id: gateway.gateway_refund_id,
        status,
        amount,
        refund_type,
        payment_method: order.payment_method,
        estimated_arrival: refund.estimated_arrival,
        remaining_refundable: remaining(&order, amount),
    })
}

fn remaining(order: &Order, refunded_now: MoneyAmount) -> MoneyAmount {
    order
        .refundable()
        .checked_sub(refunded_now)
        .unwrap_or(MoneyAmount::ZERO)
}

/// Restore stock for an explicit item list and record the breakdown.
/// Requested quantities are clamped to what the order actually holds, and
/// lines that match no order item are skipped with a warning.
async fn restore_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    items: &[OrderItem],
    lines: &[RefundItemRequest],
) -> Result<Vec<RefundedItem>, CoreError> {
    let mut recorded = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(item) = items.iter().find(|item| item.id == line.item_id) else {
            tracing::warn!(item_id = %line.item_id, "refund line matches no order item, skipped");
            continue;
        };
        let quantity = line.quantity.clamp(0, item.quantity);
        if quantity == 0 {
            continue;
        }
        inventory_repo::restore_quantity(&mut **tx, item, quantity).await?;

        let line_total = item.unit_price.minor_units() * i64::from(quantity);
        recorded.push(RefundedItem {
            item_id: item.id,
            product_id: item.product_id,
            quantity,
            refund_amount: MoneyAmount::new(line_total).unwrap_or(MoneyAmount::ZERO),
        });
    }
    Ok(recorded)
}
