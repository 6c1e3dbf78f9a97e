use {
    crate::domain::{money::MoneyAmount, order::PaymentMethod, refund::RefundStatus},
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundNotification {
    pub refund_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub amount: MoneyAmount,
    pub payment_method: PaymentMethod,
    pub status: RefundStatus,
    pub estimated_arrival: DateTime<Utc>,
}

/// COD refunds have no gateway to move the money; the back office has to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRefundAlert {
    pub refund_id: Uuid,
    pub order_number: String,
    pub amount: MoneyAmount,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusNotification {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyReceipt {
    pub sms_sent: bool,
    pub email_sent: bool,
}

/// Hands notifications to the messaging service. Failures are logged and
/// swallowed: a refund must never fail because a text message did.
pub struct Notifier {
    http: reqwest::Client,
    sink_url: Option<String>,
}

impl Notifier {
    pub fn new(http: reqwest::Client, sink_url: Option<String>) -> Self {
        Self { http, sink_url }
    }

    /// Disabled notifier for tests and local runs.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            sink_url: None,
        }
    }

    pub async fn refund_initiated(&self, notification: &RefundNotification) -> NotifyReceipt {
        if self.post("refund confirmation", notification).await {
            NotifyReceipt {
                sms_sent: true,
                email_sent: true,
            }
        } else {
            NotifyReceipt::default()
        }
    }

    pub async fn manual_refund_required(&self, alert: &AdminRefundAlert) {
        self.post("admin refund alert", alert).await;
    }

    pub async fn order_status_changed(&self, notification: &OrderStatusNotification) {
        self.post("order status update", notification).await;
    }

    async fn post<T: Serialize>(&self, what: &str, payload: &T) -> bool {
        let Some(url) = &self.sink_url else {
            tracing::debug!(what, "notification sink not configured, skipping");
            return false;
        };

        match self.http.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    what,
                    status = %response.status(),
                    "notification sink rejected the message"
                );
                false
            }
            Err(err) => {
                tracing::warn!(what, error = %err, "failed to deliver notification");
                false
            }
        }
    }
}
