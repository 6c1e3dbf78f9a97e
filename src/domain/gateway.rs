use {
    super::error::CoreError,
    super::event::GatewayEvent,
    super::money::{Currency, MoneyAmount},
    super::order::PaymentMethod,
    super::refund::RefundStatus,
    super::webhook::GatewayProvider,
    std::sync::Arc,
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// Everything an adapter needs to raise a refund with its provider.
#[derive(Debug, Clone)]
pub struct GatewayRefundRequest {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub transaction_id: Option<String>,
    pub amount: MoneyAmount,
    pub currency: Currency,
    pub reason: String,
}

/// Provider response to a refund request, in the provider's own terms.
#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub gateway_refund_id: String,
    pub gateway_status: String,
}

#[derive(Debug, Clone)]
pub struct GatewayPayoutRequest {
    pub reference: String,
    pub recipient: String,
    pub amount: MoneyAmount,
    pub currency: Currency,
    pub narration: String,
}

#[derive(Debug, Clone)]
pub struct GatewayPayout {
    pub payout_id: String,
    pub status: String,
}

/// Uniform capability implemented per payment rail. Adding a payment
/// method means one `PaymentMethod` variant plus one implementation here —
/// the orchestrator never branches on providers.
pub trait GatewayAdapter: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Verify an inbound webhook signature against the raw body. Rails
    /// without a webhook channel (wallet, COD) reject everything.
    fn verify_signature(&self, _body: &[u8], _signature: &str) -> Result<(), CoreError> {
        Err(CoreError::SignatureInvalid(format!(
            "{} does not deliver webhooks",
            self.method()
        )))
    }

    /// Normalize a verified webhook body into a `GatewayEvent`.
    fn parse_event(&self, _body: &[u8]) -> Result<GatewayEvent, CoreError> {
        Err(CoreError::Validation(format!(
            "{} does not deliver webhooks",
            self.method()
        )))
    }

    fn create_refund(
        &self,
        req: GatewayRefundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayRefund, CoreError>> + Send + '_>>;

    fn create_payout(
        &self,
        _req: GatewayPayoutRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayPayout, CoreError>> + Send + '_>> {
        let method = self.method();
        Box::pin(async move {
            Err(CoreError::Gateway {
                method,
                message: "payouts not supported on this rail".into(),
            })
        })
    }

    /// Map a provider-reported refund status onto the internal enum.
    fn map_refund_status(&self, gateway_status: &str) -> RefundStatus {
        RefundStatus::from_gateway(gateway_status)
    }
}

/// Tagged-variant dispatch: one adapter per `PaymentMethod`.
#[derive(Clone)]
pub struct GatewayRegistry {
    razorpay: Arc<dyn GatewayAdapter>,
    stripe: Arc<dyn GatewayAdapter>,
    wallet: Arc<dyn GatewayAdapter>,
    cod: Arc<dyn GatewayAdapter>,
}

impl GatewayRegistry {
    pub fn new(
        razorpay: Arc<dyn GatewayAdapter>,
        stripe: Arc<dyn GatewayAdapter>,
        wallet: Arc<dyn GatewayAdapter>,
        cod: Arc<dyn GatewayAdapter>,
    ) -> Self {
        Self {
            razorpay,
            stripe,
            wallet,
            cod,
        }
    }

    pub fn for_method(&self, method: PaymentMethod) -> &dyn GatewayAdapter {
        match method {
            PaymentMethod::Razorpay => self.razorpay.as_ref(),
            PaymentMethod::Stripe => self.stripe.as_ref(),
            PaymentMethod::Wallet => self.wallet.as_ref(),
            PaymentMethod::Cod => self.cod.as_ref(),
        }
    }

    pub fn for_provider(&self, provider: GatewayProvider) -> &dyn GatewayAdapter {
        match provider {
            GatewayProvider::Razorpay => self.razorpay.as_ref(),
            GatewayProvider::Stripe => self.stripe.as_ref(),
        }
    }
}
