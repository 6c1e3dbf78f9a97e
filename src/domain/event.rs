use {
    super::money::MoneyAmount,
    super::webhook::EventKey,
    serde::Serialize,
    uuid::Uuid,
};

/// Payload fields worth indexing on the log row, extracted per provider.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Set when the event id had to be synthesized from the clock, which
    /// means deduplication cannot be guaranteed for this delivery.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
}

/// A gateway notification normalized across providers. Produced by the
/// adapters, consumed by the payment state machine.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub event_id: EventKey,
    pub event_type: String,
    pub kind: PaymentEventKind,
    pub metadata: EventMetadata,
}

/// What actually happened, in this system's terms.
#[derive(Debug, Clone)]
pub enum PaymentEventKind {
    /// Funds collected from the payer.
    Captured {
        order_id: Option<Uuid>,
        payment_id: String,
        amount: MoneyAmount,
        occurred_at: i64,
    },
    /// Payment attempt failed; `paid_amount` is never touched.
    Failed {
        order_id: Option<Uuid>,
        reason: String,
    },
    /// Authorized but not yet captured.
    Authorized { order_id: Option<Uuid> },
    /// Gateway-level order confirmation — timeline only, no money moves.
    OrderPaid { order_id: Option<Uuid> },
    /// Refund lifecycle observed at the gateway, addressed by the payment
    /// reference (transaction id), not by order id. Reconciliation entries
    /// for refunds initiated outside the orchestrator.
    RefundCreated {
        payment_id: String,
        refund_id: String,
        amount: MoneyAmount,
    },
    RefundProcessed {
        payment_id: String,
        refund_id: String,
        amount: MoneyAmount,
    },
    RefundFailed {
        payment_id: String,
        refund_id: String,
        amount: MoneyAmount,
    },
    /// Accepted and logged, but not acted on.
    Unknown,
}

impl PaymentEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Captured { .. } => "captured",
            Self::Failed { .. } => "failed",
            Self::Authorized { .. } => "authorized",
            Self::OrderPaid { .. } => "order_paid",
            Self::RefundCreated { .. } => "refund_created",
            Self::RefundProcessed { .. } => "refund_processed",
            Self::RefundFailed { .. } => "refund_failed",
            Self::Unknown => "unknown",
        }
    }
}
