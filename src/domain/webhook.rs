use {
    super::error::CoreError,
    chrono::Utc,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    Razorpay,
    Stripe,
}

impl GatewayProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Razorpay => "razorpay",
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GatewayProvider {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "razorpay" => Ok(Self::Razorpay),
            "stripe" => Ok(Self::Stripe),
            other => Err(CoreError::Validation(format!(
                "unknown webhook provider: {other}"
            ))),
        }
    }
}

/// Idempotency key half: the provider-scoped event identifier. For Stripe
/// this is the `evt_` id; for Razorpay it is derived from the entity id and
/// event type (the payload carries no event id of its own), and when no
/// entity id exists either it is synthesized from the clock — that last
/// class cannot be deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKey(String);

impl EventKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn synthesized() -> Self {
        Self(format!("event_{}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookStatus {
    Processing,
    Success,
    Failed,
    Duplicate,
}

impl WebhookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// For INSERT into the append-only webhook log.
#[derive(Debug, Clone)]
pub struct NewWebhookLog {
    pub id: Uuid,
    pub provider: GatewayProvider,
    pub event_id: EventKey,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub signature_valid: bool,
    pub status: WebhookStatus,
    pub metadata: Option<serde_json::Value>,
}

impl NewWebhookLog {
    pub fn processing(
        provider: GatewayProvider,
        event_id: EventKey,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        signature: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider,
            event_id,
            event_type: event_type.into(),
            payload,
            signature: signature.into(),
            signature_valid: true,
            status: WebhookStatus::Processing,
            metadata,
        }
    }

    /// Record of a delivery that failed signature verification. Gets a
    /// synthesized event id so it never collides with a real event.
    pub fn verification_failure(
        provider: GatewayProvider,
        payload: serde_json::Value,
        signature: impl Into<String>,
        error: &str,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider,
            event_id: EventKey::new(format!("failed_{}", Utc::now().timestamp_millis())),
            event_type: "unknown".into(),
            payload,
            signature: signature.into(),
            signature_valid: false,
            status: WebhookStatus::Failed,
            metadata: Some(serde_json::json!({ "error": error })),
        }
    }
}
