use {
    crate::domain::{
        error::CoreError,
        event::{EventMetadata, GatewayEvent, PaymentEventKind},
        gateway::{
            GatewayAdapter, GatewayPayout, GatewayPayoutRequest, GatewayRefund,
            GatewayRefundRequest,
        },
        money::MoneyAmount,
        order::PaymentMethod,
        webhook::EventKey,
    },
    hmac::{Hmac, Mac},
    serde::Deserialize,
    sha2::Sha256,
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

/// Card/UPI rail. Webhook signatures are HMAC-SHA256 over the raw body,
/// hex-encoded in the `X-Razorpay-Signature` header; API calls use basic
/// auth with the key pair.
pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(
        http: reqwest::Client,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn create_refund_inner(
        &self,
        req: GatewayRefundRequest,
    ) -> Result<GatewayRefund, CoreError> {
        let payment_id = req.transaction_id.ok_or_else(|| CoreError::Gateway {
            method: PaymentMethod::Razorpay,
            message: "payment transaction id not found on order".into(),
        })?;

        let body = serde_json::json!({
            "amount": req.amount.minor_units(),
            "notes": {
                "orderId": req.order_number,
                "reason": req.reason,
            },
        });

        let response = self
            .http
            .post(format!("{}/payments/{payment_id}/refund", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| gateway_err(format!("refund request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(gateway_err(format!("refund rejected ({status}): {detail}")));
        }

        let refund: RefundResponse = response
            .json()
            .await
            .map_err(|e| gateway_err(format!("malformed refund response: {e}")))?;

        Ok(GatewayRefund {
            gateway_refund_id: refund.id,
            gateway_status: refund.status,
        })
    }

    async fn create_payout_inner(
        &self,
        req: GatewayPayoutRequest,
    ) -> Result<GatewayPayout, CoreError> {
        let body = serde_json::json!({
            "reference_id": req.reference,
            "fund_account_id": req.recipient,
            "amount": req.amount.minor_units(),
            "currency": req.currency.as_str().to_uppercase(),
            "purpose": "cashback",
            "narration": req.narration,
        });

        let response = self
            .http
            .post(format!("{}/payouts", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| gateway_err(format!("payout request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(gateway_err(format!("payout rejected ({status}): {detail}")));
        }

        let payout: PayoutResponse = response
            .json()
            .await
            .map_err(|e| gateway_err(format!("malformed payout response: {e}")))?;

        Ok(GatewayPayout {
            payout_id: payout.id,
            status: payout.status,
        })
    }
}

fn gateway_err(message: String) -> CoreError {
    CoreError::Gateway {
        method: PaymentMethod::Razorpay,
        message,
    }
}

impl GatewayAdapter for RazorpayGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Razorpay
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> Result<(), CoreError> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| CoreError::SignatureInvalid("invalid webhook secret".into()))?;
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());
        if constant_time_eq_hex(&expected, signature) {
            Ok(())
        } else {
            Err(CoreError::SignatureInvalid(
                "razorpay signature mismatch".into(),
            ))
        }
    }

    fn parse_event(&self, body: &[u8]) -> Result<GatewayEvent, CoreError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        Ok(normalize_event(envelope))
    }

    fn create_refund(
        &self,
        req: GatewayRefundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayRefund, CoreError>> + Send + '_>> {
        Box::pin(self.create_refund_inner(req))
    }

    fn create_payout(
        &self,
        req: GatewayPayoutRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayPayout, CoreError>> + Send + '_>> {
        Box::pin(self.create_payout_inner(req))
    }
}

fn constant_time_eq_hex(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    payment: Option<Wrapped<PaymentEntity>>,
    order: Option<Wrapped<OrderEntity>>,
    refund: Option<Wrapped<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    /// Razorpay sends `{}` for empty notes but `[]` on some event types,
    /// so this stays an untyped value.
    #[serde(default)]
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OrderEntity {
    id: String,
    #[serde(default)]
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RefundEntity {
    id: String,
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct PayoutResponse {
    id: String,
    #[serde(default)]
    status: String,
}

fn order_id_from_notes(notes: &serde_json::Value) -> Option<Uuid> {
    notes
        .get("orderId")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Razorpay payloads carry no event id, so the dedup key is derived from
/// the entity id plus the event type — stable across redeliveries of one
/// logical event, distinct for different events on the same payment.
fn normalize_event(envelope: Envelope) -> GatewayEvent {
    let event_type = envelope.event.clone();
    let mut metadata = EventMetadata::default();

    let (event_id, kind) = if let Some(payment) = envelope.payload.payment {
        let p = payment.entity;
        let order_id = order_id_from_notes(&p.notes);
        metadata.payment_id = Some(p.id.clone());
        metadata.order_id = order_id;
        metadata.amount = Some(p.amount);
        metadata.currency = Some(p.currency.clone());

        let key = EventKey::new(format!("{}/{}", p.id, envelope.event));
        let kind = match envelope.event.as_str() {
            "payment.captured" => PaymentEventKind::Captured {
                order_id,
                payment_id: p.id,
                amount: MoneyAmount::new(p.amount.max(0)).unwrap_or(MoneyAmount::ZERO),
                occurred_at: p.created_at,
            },
            "payment.failed" => PaymentEventKind::Failed {
                order_id,
                reason: p
                    .error_description
                    .or(p.error_code)
                    .unwrap_or_else(|| "payment failed".into()),
            },
            "payment.authorized" => PaymentEventKind::Authorized { order_id },
            _ => PaymentEventKind::Unknown,
        };
        (key, kind)
    } else if let Some(order) = envelope.payload.order {
        let o = order.entity;
        let order_id = order_id_from_notes(&o.notes);
        metadata.order_id = order_id;

        let key = EventKey::new(format!("{}/{}", o.id, envelope.event));
        let kind = match envelope.event.as_str() {
            "order.paid" => PaymentEventKind::OrderPaid { order_id },
            _ => PaymentEventKind::Unknown,
        };
        (key, kind)
    } else if let Some(refund) = envelope.payload.refund {
        let r = refund.entity;
        metadata.payment_id = Some(r.payment_id.clone());
        metadata.amount = Some(r.amount);

        let key = EventKey::new(format!("{}/{}", r.id, envelope.event));
        let amount = MoneyAmount::new(r.amount.max(0)).unwrap_or(MoneyAmount::ZERO);
        let kind = match envelope.event.as_str() {
            "refund.created" => PaymentEventKind::RefundCreated {
                payment_id: r.payment_id,
                refund_id: r.id,
                amount,
            },
            "refund.processed" => PaymentEventKind::RefundProcessed {
                payment_id: r.payment_id,
                refund_id: r.id,
                amount,
            },
            "refund.failed" => PaymentEventKind::RefundFailed {
                payment_id: r.payment_id,
                refund_id: r.id,
                amount,
            },
            _ => PaymentEventKind::Unknown,
        };
        (key, kind)
    } else {
        // No entity id anywhere — synthesize a key. Cannot be deduplicated.
        metadata.synthesized = true;
        (EventKey::synthesized(), PaymentEventKind::Unknown)
    };

    GatewayEvent {
        event_id,
        event_type,
        kind,
        metadata,
    }
}
