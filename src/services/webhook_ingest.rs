use {
    crate::domain::{
        error::CoreError,
        gateway::GatewayRegistry,
        webhook::{EventKey, GatewayProvider, NewWebhookLog},
    },
    crate::infra::postgres::webhook_log_repo,
    crate::services::payment_events,
    sqlx::PgPool,
};

/// What the gateway gets told. Everything past signature verification is
/// acknowledged with 200 so the gateway stops retrying; the distinction
/// lives in the body and the log row.
#[derive(Debug)]
pub enum IngestOutcome {
    Processed(EventKey),
    Duplicate(EventKey),
    Failed { event_id: EventKey, error: String },
}

/// Ingest one raw webhook delivery: verify, log, dedup, apply.
///
/// The log row is committed before the event is applied, so a crash
/// mid-processing leaves a `processing` row to reconcile rather than a
/// silently dropped event. Redeliveries hit the unique constraint and are
/// acknowledged as duplicates without touching the original row's status.
pub async fn ingest(
    pool: &PgPool,
    gateways: &GatewayRegistry,
    provider: GatewayProvider,
    body: &[u8],
    signature: &str,
) -> Result<IngestOutcome, CoreError> {
    let adapter = gateways.for_provider(provider);

    if let Err(err) = adapter.verify_signature(body, signature) {
        record_verification_failure(pool, provider, body, signature, &err).await;
        return Err(err);
    }

    let event = match adapter.parse_event(body) {
        Ok(event) => event,
        Err(err) => {
            // Authenticated but unparseable. Keep the evidence, ack the
            // delivery so the gateway does not retry a payload we will
            // never understand.
            let log = NewWebhookLog::processing(
                provider,
                EventKey::synthesized(),
                "unparseable",
                raw_payload(body),
                signature,
                None,
            );
            let event_id = log.event_id.clone();
            webhook_log_repo::insert(pool, &log).await?;
            webhook_log_repo::mark_failed(pool, log.id, &err.to_string()).await?;
            return Ok(IngestOutcome::Failed {
                event_id,
                error: err.to_string(),
            });
        }
    };

    let log = NewWebhookLog::processing(
        provider,
        event.event_id.clone(),
        event.event_type.clone(),
        raw_payload(body),
        signature,
        serde_json::to_value(&event.metadata).ok(),
    );

    if !webhook_log_repo::insert(pool, &log).await? {
        webhook_log_repo::record_redelivery(pool, provider, &event.event_id).await?;
        tracing::info!(
            provider = %provider,
            event_id = %event.event_id,
            "duplicate webhook delivery acknowledged"
        );
        return Ok(IngestOutcome::Duplicate(event.event_id));
    }

    match payment_events::apply(pool, &event).await {
        Ok(()) => {
            webhook_log_repo::mark_success(pool, log.id).await?;
            tracing::info!(
                provider = %provider,
                event_id = %event.event_id,
                event_type = %event.event_type,
                "webhook processed"
            );
            Ok(IngestOutcome::Processed(event.event_id))
        }
        Err(err) => {
            webhook_log_repo::mark_failed(pool, log.id, &err.to_string()).await?;
            tracing::error!(
                provider = %provider,
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %err,
                "webhook accepted but processing failed"
            );
            Ok(IngestOutcome::Failed {
                event_id: event.event_id,
                error: err.to_string(),
            })
        }
    }
}

fn raw_payload(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::json!({ "raw": String::from_utf8_lossy(body) }))
}

/// Best effort: the 401 must go out even if the forensic row cannot be
/// written.
async fn record_verification_failure(
    pool: &PgPool,
    provider: GatewayProvider,
    body: &[u8],
    signature: &str,
    err: &CoreError,
) {
    let log =
        NewWebhookLog::verification_failure(provider, raw_payload(body), signature, &err.to_string());
    if let Err(log_err) = webhook_log_repo::insert(pool, &log).await {
        tracing::error!(provider = %provider, error = %log_err, "failed to log rejected webhook");
    }
}
