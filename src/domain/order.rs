use {
    super::error::CoreError,
    super::money::{Currency, MoneyAmount},
    super::refund::RefundType,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Payment axis of the order, independent of the fulfilment lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }

    /// Valid forward transitions. `Refunded` is terminal: once fully
    /// refunded, no capture event may regress the status.
    pub fn can_transition_to(&self, new: &PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, new),
            (Pending, Processing)
                | (Pending, Paid)
                | (Pending, Failed)
                | (Processing, Paid)
                | (Processing, Failed)
                | (Failed, Processing)
                | (Failed, Paid)
                | (Paid, Refunded)
                | (Paid, PartiallyRefunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            other => Err(CoreError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Razorpay,
    Stripe,
    Wallet,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Razorpay => "razorpay",
            Self::Stripe => "stripe",
            Self::Wallet => "wallet",
            Self::Cod => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "razorpay" => Ok(Self::Razorpay),
            "stripe" => Ok(Self::Stripe),
            "wallet" => Ok(Self::Wallet),
            "cod" => Ok(Self::Cod),
            other => Err(CoreError::Validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Fulfilment lifecycle — a separate axis from `PaymentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    Ready,
    Dispatched,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Dispatched => "dispatched",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(CoreError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub store_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: MoneyAmount,
    pub variant: Option<Variant>,
}

/// Order aggregate as read from the database. The payment core only
/// touches the payment/totals fields and appends timeline rows.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refund_id: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub total: MoneyAmount,
    pub paid_amount: MoneyAmount,
    pub refund_amount: MoneyAmount,
    pub currency: Currency,
}

impl Order {
    /// What is still eligible to be refunded.
    pub fn refundable(&self) -> MoneyAmount {
        self.paid_amount
            .checked_sub(self.refund_amount)
            .unwrap_or(MoneyAmount::ZERO)
    }

    /// Fast-fail eligibility checks for a refund request, in the order a
    /// merchant sees them: refunded > unpaid > zero amount > overdraw.
    pub fn check_refund_eligibility(&self, amount: MoneyAmount) -> Result<RefundType, CoreError> {
        if self.payment_status == PaymentStatus::Refunded {
            return Err(CoreError::AlreadyRefunded);
        }
        if matches!(
            self.payment_status,
            PaymentStatus::Pending | PaymentStatus::Failed
        ) {
            return Err(CoreError::InvalidPaymentState(format!(
                "cannot refund unpaid order (payment status: {})",
                self.payment_status
            )));
        }
        if amount.is_zero() {
            return Err(CoreError::InvalidAmount);
        }
        let available = self.refundable();
        if amount > available {
            return Err(CoreError::InsufficientRefundable {
                requested: amount,
                available,
            });
        }
        Ok(if amount < self.paid_amount {
            RefundType::Partial
        } else {
            RefundType::Full
        })
    }
}

/// One appended audit-narrative row. Never mutated after insert.
#[derive(Debug, Clone)]
pub struct NewTimelineEntry {
    pub status: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewTimelineEntry {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
