use thiserror::Error;

use super::money::MoneyAmount;
use super::order::PaymentMethod;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing webhook signature header")]
    MissingSignature,

    #[error("webhook signature: {0}")]
    SignatureInvalid(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("order is already fully refunded")]
    AlreadyRefunded,

    #[error("invalid payment state: {0}")]
    InvalidPaymentState(String),

    #[error("refund amount must be greater than 0")]
    InvalidAmount,

    #[error("refund amount {requested} exceeds refundable balance {available}")]
    InsufficientRefundable {
        requested: MoneyAmount,
        available: MoneyAmount,
    },

    #[error("{method} gateway: {message}")]
    Gateway {
        method: PaymentMethod,
        message: String,
    },

    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
