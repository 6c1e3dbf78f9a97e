use {
    crate::domain::{
        error::CoreError,
        refund::{NewRefund, RefundStatus},
    },
    sqlx::PgExecutor,
    uuid::Uuid,
};

pub async fn insert<'e, E: PgExecutor<'e>>(exec: E, refund: &NewRefund) -> Result<(), CoreError> {
    let refunded_items = serde_json::to_value(&refund.refunded_items)?;
    let completed = refund.status == RefundStatus::Completed;

    sqlx::query(
        r#"
        INSERT INTO refunds
            (id, order_id, user_id, order_number, payment_method, refund_amount,
             refund_type, refund_reason, gateway_refund_id, gateway_status,
             status, refunded_items, requested_at, processed_at, completed_at,
             estimated_arrival)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now(),
                CASE WHEN $14 THEN now() END, $15)
        "#,
    )
    .bind(refund.id)
    .bind(refund.order_id)
    .bind(refund.user_id)
    .bind(&refund.order_number)
    .bind(refund.payment_method.as_str())
    .bind(refund.refund_amount.minor_units())
    .bind(refund.refund_type.as_str())
    .bind(&refund.refund_reason)
    .bind(&refund.gateway_refund_id)
    .bind(&refund.gateway_status)
    .bind(refund.status.as_str())
    .bind(refunded_items)
    .bind(refund.requested_at)
    .bind(completed)
    .bind(refund.estimated_arrival)
    .execute(exec)
    .await?;
    Ok(())
}

/// An existing row for this gateway refund id means the refund originated
/// here, not at the gateway dashboard.
pub async fn exists_by_gateway_id<'e, E: PgExecutor<'e>>(
    exec: E,
    gateway_refund_id: &str,
) -> Result<bool, CoreError> {
    let found: Option<bool> =
        sqlx::query_scalar("SELECT true FROM refunds WHERE gateway_refund_id = $1 LIMIT 1")
            .bind(gateway_refund_id)
            .fetch_optional(exec)
            .await?;
    Ok(found.is_some())
}

/// Settlement observed at the gateway: close out the audit row that was
/// waiting on this gateway refund id.
pub async fn mark_completed_by_gateway_id<'e, E: PgExecutor<'e>>(
    exec: E,
    gateway_refund_id: &str,
    gateway_status: &str,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE refunds SET status = 'completed', gateway_status = $2, completed_at = now(), \
         actual_arrival = now() WHERE gateway_refund_id = $1 AND status <> 'completed'",
    )
    .bind(gateway_refund_id)
    .bind(gateway_status)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_failed_by_gateway_id<'e, E: PgExecutor<'e>>(
    exec: E,
    gateway_refund_id: &str,
    gateway_status: &str,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE refunds SET status = 'failed', gateway_status = $2, failed_at = now() \
         WHERE gateway_refund_id = $1 AND status NOT IN ('completed', 'failed')",
    )
    .bind(gateway_refund_id)
    .bind(gateway_status)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_notified<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    sms_sent: bool,
    email_sent: bool,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE refunds SET sms_sent = $2, email_sent = $3, notified_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(sms_sent)
    .bind(email_sent)
    .execute(exec)
    .await?;
    Ok(())
}
