use {
    crate::domain::{
        error::CoreError,
        webhook::{EventKey, GatewayProvider, NewWebhookLog},
    },
    sqlx::PgExecutor,
    uuid::Uuid,
};

/// Append the log row for a fresh delivery. The UNIQUE (provider, event_id)
/// constraint makes this the idempotency gate: ON CONFLICT DO NOTHING means
/// exactly one of two racing deliveries wins the insert. Returns false when
/// the row already existed.
pub async fn insert<'e, E: PgExecutor<'e>>(
    exec: E,
    log: &NewWebhookLog,
) -> Result<bool, CoreError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO webhook_log
            (id, provider, event_id, event_type, payload, signature,
             signature_valid, status, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (provider, event_id) DO NOTHING
        "#,
    )
    .bind(log.id)
    .bind(log.provider.as_str())
    .bind(log.event_id.as_str())
    .bind(&log.event_type)
    .bind(&log.payload)
    .bind(&log.signature)
    .bind(log.signature_valid)
    .bind(log.status.as_str())
    .bind(&log.metadata)
    .execute(exec)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Redelivery of an already-seen event. The original row's status is never
/// rewritten; only the retry counter moves.
pub async fn record_redelivery<'e, E: PgExecutor<'e>>(
    exec: E,
    provider: GatewayProvider,
    event_id: &EventKey,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE webhook_log SET retry_count = retry_count + 1, updated_at = now() \
         WHERE provider = $1 AND event_id = $2",
    )
    .bind(provider.as_str())
    .bind(event_id.as_str())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_success<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE webhook_log SET status = 'success', processed = true, processed_at = now(), \
         updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_failed<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    error: &str,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE webhook_log SET status = 'failed', error_message = $2, \
         retry_count = retry_count + 1, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(error)
    .execute(exec)
    .await?;
    Ok(())
}
