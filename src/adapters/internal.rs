use {
    crate::domain::{
        error::CoreError,
        gateway::{GatewayAdapter, GatewayRefund, GatewayRefundRequest},
        order::PaymentMethod,
    },
    chrono::Utc,
    sqlx::PgPool,
    std::{future::Future, pin::Pin},
};

/// Internal balance ledger. Refunds credit the customer's wallet in one
/// atomic statement and complete synchronously — there is no asynchronous
/// gateway leg to wait for.
pub struct WalletGateway {
    pool: PgPool,
}

impl WalletGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn credit(&self, req: GatewayRefundRequest) -> Result<GatewayRefund, CoreError> {
        let credited = sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET balance = wallets.balance + EXCLUDED.balance, updated_at = now()
            WHERE NOT wallets.is_frozen
            "#,
        )
        .bind(req.user_id)
        .bind(req.amount.minor_units())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if credited == 0 {
            return Err(CoreError::Gateway {
                method: PaymentMethod::Wallet,
                message: format!("wallet for user {} is frozen", req.user_id),
            });
        }

        Ok(GatewayRefund {
            gateway_refund_id: format!("wallet_refund_{}", Utc::now().timestamp_millis()),
            gateway_status: "completed".into(),
        })
    }
}

impl GatewayAdapter for WalletGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Wallet
    }

    fn create_refund(
        &self,
        req: GatewayRefundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayRefund, CoreError>> + Send + '_>> {
        Box::pin(self.credit(req))
    }
}

/// Cash on delivery has no live gateway: the refund is parked for the
/// back office, which moves the money by hand.
pub struct CodGateway;

impl GatewayAdapter for CodGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cod
    }

    fn create_refund(
        &self,
        _req: GatewayRefundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GatewayRefund, CoreError>> + Send + '_>> {
        Box::pin(async {
            Ok(GatewayRefund {
                gateway_refund_id: format!("cod_refund_{}", Utc::now().timestamp_millis()),
                gateway_status: "pending_manual_processing".into(),
            })
        })
    }
}
