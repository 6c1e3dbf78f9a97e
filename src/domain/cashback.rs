use {
    super::error::CoreError,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashbackStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl CashbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    /// Pending requests can be decided either way; only approved ones can
    /// be paid out. Rejected and paid are terminal.
    pub fn can_transition_to(&self, next: CashbackStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Paid)
        )
    }
}

impl fmt::Display for CashbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for CashbackStatus {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "paid" => Ok(Self::Paid),
            other => Err(CoreError::Validation(format!(
                "unknown cashback status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CashbackRequest {
    pub id: Uuid,
    pub request_number: String,
    pub merchant_id: Uuid,
    pub customer_id: Uuid,
    pub requested_amount: MoneyAmount,
    pub approved_amount: Option<MoneyAmount>,
    pub status: CashbackStatus,
    pub payout_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
