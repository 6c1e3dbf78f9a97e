use {
    super::error::CoreError,
    super::money::MoneyAmount,
    super::order::PaymentMethod,
    chrono::{DateTime, Duration, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundType {
    Full,
    Partial,
}

impl RefundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for RefundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Map a provider-reported refund status onto the internal enum.
    /// COD's `pending_manual_processing` stays pending until back office
    /// moves the money by hand.
    pub fn from_gateway(gateway_status: &str) -> Self {
        match gateway_status {
            "completed" | "processed" | "succeeded" => Self::Completed,
            "pending_manual_processing" => Self::Pending,
            "failed" | "canceled" | "cancelled" => Self::Failed,
            _ => Self::Processing,
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RefundStatus {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!(
                "unknown refund status: {other}"
            ))),
        }
    }
}

/// Item-level breakdown of a refund. An empty list means the whole order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundedItem {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub refund_amount: MoneyAmount,
}

/// One refund attempt, written exactly once per accepted request.
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub payment_method: PaymentMethod,
    pub refund_amount: MoneyAmount,
    pub refund_type: RefundType,
    pub refund_reason: String,
    pub gateway_refund_id: String,
    pub gateway_status: String,
    pub status: RefundStatus,
    pub refunded_items: Vec<RefundedItem>,
    pub requested_at: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
}

/// When the customer should expect the money: instant for the internal
/// balance, 3 days for COD (manual transfer), 7 days for card rails.
pub fn estimated_arrival(method: PaymentMethod, now: DateTime<Utc>) -> DateTime<Utc> {
    match method {
        PaymentMethod::Wallet => now,
        PaymentMethod::Cod => now + Duration::days(3),
        PaymentMethod::Razorpay | PaymentMethod::Stripe => now + Duration::days(7),
    }
}
