use {
    crate::domain::{
        error::CoreError,
        money::{Currency, MoneyAmount},
        order::{NewTimelineEntry, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Variant},
    },
    chrono::{DateTime, Utc},
    sqlx::{PgExecutor, Row, postgres::PgRow},
    uuid::Uuid,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_method, payment_status, \
     transaction_id, paid_at, refund_id, refunded_at, total, paid_amount, refund_amount, currency";

fn order_from_row(row: PgRow) -> Result<Order, CoreError> {
    let status: String = row.try_get("status")?;
    let payment_method: String = row.try_get("payment_method")?;
    let payment_status: String = row.try_get("payment_status")?;
    let currency: String = row.try_get("currency")?;

    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        user_id: row.try_get("user_id")?,
        status: OrderStatus::try_from(status.as_str())?,
        payment_method: PaymentMethod::try_from(payment_method.as_str())?,
        payment_status: PaymentStatus::try_from(payment_status.as_str())?,
        transaction_id: row.try_get("transaction_id")?,
        paid_at: row.try_get("paid_at")?,
        refund_id: row.try_get("refund_id")?,
        refunded_at: row.try_get("refunded_at")?,
        total: MoneyAmount::new(row.try_get("total")?)?,
        paid_amount: MoneyAmount::new(row.try_get("paid_amount")?)?,
        refund_amount: MoneyAmount::new(row.try_get("refund_amount")?)?,
        currency: Currency::try_from(currency.as_str())?,
    })
}

pub async fn get<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> Result<Option<Order>, CoreError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    row.map(order_from_row).transpose()
}

/// Refund webhooks address orders by the gateway payment reference, not by
/// order id.
pub async fn get_by_transaction<'e, E: PgExecutor<'e>>(
    exec: E,
    transaction_id: &str,
) -> Result<Option<Order>, CoreError> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE transaction_id = $1"
    ))
    .bind(transaction_id)
    .fetch_optional(exec)
    .await?;
    row.map(order_from_row).transpose()
}

pub async fn items<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
) -> Result<Vec<OrderItem>, CoreError> {
    let rows = sqlx::query(
        "SELECT id, order_id, product_id, store_id, quantity, unit_price, variant_type, variant_value \
         FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(exec)
    .await?;

    rows.into_iter()
        .map(|row| {
            let variant_type: Option<String> = row.try_get("variant_type")?;
            let variant_value: Option<String> = row.try_get("variant_value")?;
            Ok(OrderItem {
                id: row.try_get("id")?,
                order_id: row.try_get("order_id")?,
                product_id: row.try_get("product_id")?,
                store_id: row.try_get("store_id")?,
                quantity: row.try_get("quantity")?,
                unit_price: MoneyAmount::new(row.try_get("unit_price")?)?,
                variant: match (variant_type, variant_value) {
                    (Some(kind), Some(value)) => Some(Variant { kind, value }),
                    _ => None,
                },
            })
        })
        .collect()
}

pub async fn append_timeline<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    entry: &NewTimelineEntry,
) -> Result<(), CoreError> {
    sqlx::query(
        "INSERT INTO order_timeline (order_id, status, message, metadata) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(&entry.status)
    .bind(&entry.message)
    .bind(&entry.metadata)
    .execute(exec)
    .await?;
    Ok(())
}

/// Capture: mark paid and record what the gateway collected. Guarded at
/// the call site by the already-paid check.
pub async fn record_capture<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    transaction_id: &str,
    amount: MoneyAmount,
    paid_at: DateTime<Utc>,
) -> Result<(), CoreError> {
    sqlx::query(
        r#"
        UPDATE orders
        SET payment_status = 'paid', transaction_id = $2, paid_at = $3,
            paid_amount = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .bind(transaction_id)
    .bind(paid_at)
    .bind(amount.minor_units())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_processing<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE orders SET payment_status = 'processing', updated_at = now() \
         WHERE id = $1 AND payment_status IN ('pending', 'failed')",
    )
    .bind(order_id)
    .execute(exec)
    .await?;
    Ok(())
}

/// Payment failure never touches `paid_amount` and never regresses a paid
/// order.
pub async fn mark_failed<'e, E: PgExecutor<'e>>(exec: E, order_id: Uuid) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE orders SET payment_status = 'failed', updated_at = now() \
         WHERE id = $1 AND payment_status IN ('pending', 'processing')",
    )
    .bind(order_id)
    .execute(exec)
    .await?;
    Ok(())
}

/// Reconciliation for refunds initiated at the gateway, outside the
/// orchestrator. LEAST keeps the refund_amount <= paid_amount invariant
/// even if the gateway reports more than we ever collected.
pub async fn reconcile_refund<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    gateway_refund_id: &str,
    delta: MoneyAmount,
) -> Result<(), CoreError> {
    sqlx::query(
        r#"
        UPDATE orders
        SET refund_amount = LEAST(paid_amount, refund_amount + $3),
            payment_status = 'refunded', refund_id = $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .bind(gateway_refund_id)
    .bind(delta.minor_units())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_refund_settled<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE orders SET refunded_at = now(), updated_at = now() WHERE id = $1")
        .bind(order_id)
        .execute(exec)
        .await?;
    Ok(())
}

/// Orchestrated refund totals update. The WHERE clause re-asserts the
/// refundable balance inside the transaction, so a concurrent refund that
/// slipped past the pre-check cannot overdraw; returns false when the
/// guard rejects the update.
pub async fn apply_refund<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    amount: MoneyAmount,
    new_status: PaymentStatus,
    gateway_refund_id: &str,
    full_refund: bool,
) -> Result<bool, CoreError> {
    let updated = sqlx::query(
        r#"
        UPDATE orders
        SET refund_amount = refund_amount + $2,
            payment_status = $3,
            refund_id = $4,
            refunded_at = now(),
            status = CASE WHEN $5 THEN 'refunded' ELSE status END,
            updated_at = now()
        WHERE id = $1 AND refund_amount + $2 <= paid_amount
        "#,
    )
    .bind(order_id)
    .bind(amount.minor_units())
    .bind(new_status.as_str())
    .bind(gateway_refund_id)
    .bind(full_refund)
    .execute(exec)
    .await?
    .rows_affected();

    Ok(updated > 0)
}

pub async fn set_status<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<(), CoreError> {
    sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
        .bind(order_id)
        .bind(status.as_str())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_cancelled<'e, E: PgExecutor<'e>>(
    exec: E,
    order_id: Uuid,
    reason: &str,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE orders SET status = 'cancelled', cancelled_at = now(), cancel_reason = $2, \
         updated_at = now() WHERE id = $1",
    )
    .bind(order_id)
    .bind(reason)
    .execute(exec)
    .await?;
    Ok(())
}
