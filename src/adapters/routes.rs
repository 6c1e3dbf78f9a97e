use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::CoreError,
            money::MoneyAmount,
            webhook::GatewayProvider,
        },
        services::{
            bulk_actions::{self, CashbackDecision, OrderAction},
            refund_flow::{self, RefundItemRequest, RefundRequest},
            webhook_ingest::{self, IngestOutcome},
        },
    },
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::HeaderMap,
        routing::{get, post},
    },
    serde::Deserialize,
    uuid::Uuid,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/webhooks/razorpay", post(razorpay_webhook))
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/orders/{id}/refund", post(refund_order))
        .route("/orders/bulk-action", post(bulk_order_action))
        .route("/cashbacks/bulk-action", post(bulk_cashback_action))
        .route("/cashbacks/{id}/mark-paid", post(mark_cashback_paid))
        .route(
            "/merchants/{id}/cashbacks/pending-count",
            get(pending_cashbacks),
        )
        .with_state(state)
}

fn signature_header(headers: &HeaderMap, name: &str) -> Result<String, CoreError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(CoreError::MissingSignature)
}

/// One body shape for both webhook routes: the delivery is acknowledged
/// with 200 whenever the signature checked out, and the outcome rides in
/// the body.
fn ack(outcome: IngestOutcome) -> Json<serde_json::Value> {
    let body = match outcome {
        IngestOutcome::Processed(event_id) => serde_json::json!({
            "received": true,
            "status": "success",
            "eventId": event_id,
        }),
        IngestOutcome::Duplicate(event_id) => serde_json::json!({
            "received": true,
            "status": "duplicate",
            "eventId": event_id,
        }),
        IngestOutcome::Failed { event_id, error } => serde_json::json!({
            "received": true,
            "status": "error",
            "eventId": event_id,
            "error": error,
        }),
    };
    Json(body)
}

#[tracing::instrument(name = "razorpay_webhook", skip_all)]
async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = signature_header(&headers, "x-razorpay-signature")?;
    let outcome = webhook_ingest::ingest(
        &state.pool,
        &state.gateways,
        GatewayProvider::Razorpay,
        &body,
        &signature,
    )
    .await?;
    Ok(ack(outcome))
}

#[tracing::instrument(name = "stripe_webhook", skip_all)]
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = signature_header(&headers, "stripe-signature")?;
    let outcome = webhook_ingest::ingest(
        &state.pool,
        &state.gateways,
        GatewayProvider::Stripe,
        &body,
        &signature,
    )
    .await?;
    Ok(ack(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundBody {
    /// Minor units; omitted means the full refundable balance.
    amount: Option<i64>,
    reason: String,
    refund_items: Option<Vec<RefundItemBody>>,
    /// Defaults to true.
    notify_customer: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundItemBody {
    item_id: Uuid,
    quantity: i32,
}

#[tracing::instrument(name = "refund_order", skip(state, body))]
async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<RefundBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let amount = body.amount.map(MoneyAmount::new).transpose()?;
    let refund_items = body.refund_items.map(|items| {
        items
            .into_iter()
            .map(|item| RefundItemRequest {
                item_id: item.item_id,
                quantity: item.quantity,
            })
            .collect()
    });
    let receipt = refund_flow::refund_order(
        &state.pool,
        &state.gateways,
        &state.notifier,
        RefundRequest {
            order_id,
            amount,
            reason: body.reason,
            refund_items,
            notify_customer: body.notify_customer.unwrap_or(true),
        },
    )
    .await?;

    Ok(Json(serde_json::json!({
        "refundId": receipt.refund_id,
        "gatewayRefundId": receipt.gateway_refund_id,
        "status": receipt.status,
        "amount": receipt.amount,
        "refundType": receipt.refund_type,
        "paymentMethod": receipt.payment_method,
        "estimatedArrival": receipt.estimated_arrival,
        "remainingRefundableAmount": receipt.remaining_refundable,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkOrderBody {
    #[serde(flatten)]
    action: OrderAction,
    order_ids: Vec<Uuid>,
}

#[tracing::instrument(name = "bulk_order_action", skip_all)]
async fn bulk_order_action(
    State(state): State<AppState>,
    Json(body): Json<BulkOrderBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = bulk_actions::bulk_order_action(
        &state.pool,
        &state.notifier,
        &body.action,
        &body.order_ids,
    )
    .await?;
    Ok(Json(serde_json::to_value(outcome).map_err(CoreError::from)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkCashbackBody {
    #[serde(flatten)]
    decision: CashbackDecision,
    request_ids: Vec<Uuid>,
}

#[tracing::instrument(name = "bulk_cashback_action", skip_all)]
async fn bulk_cashback_action(
    State(state): State<AppState>,
    Json(body): Json<BulkCashbackBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = bulk_actions::bulk_cashback_decision(
        &state.pool,
        &state.pending_cache,
        &body.decision,
        &body.request_ids,
    )
    .await?;
    Ok(Json(serde_json::to_value(outcome).map_err(CoreError::from)?))
}

#[tracing::instrument(name = "mark_cashback_paid", skip(state))]
async fn mark_cashback_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let receipt =
        bulk_actions::mark_cashback_paid(&state.pool, &state.gateways, &state.pending_cache, id)
            .await?;
    Ok(Json(serde_json::to_value(receipt).map_err(CoreError::from)?))
}

#[tracing::instrument(name = "pending_cashbacks", skip(state))]
async fn pending_cashbacks(
    State(state): State<AppState>,
    Path(merchant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count =
        bulk_actions::pending_cashbacks(&state.pool, &state.pending_cache, merchant_id).await?;
    Ok(Json(serde_json::to_value(count).map_err(CoreError::from)?))
}
