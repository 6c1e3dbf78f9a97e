use crate::domain::error::CoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapter
/// layer, not in the domain.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            CoreError::MissingSignature => (
                StatusCode::BAD_REQUEST,
                "missing_signature",
                self.0.to_string(),
            ),
            CoreError::SignatureInvalid(_) => (
                StatusCode::UNAUTHORIZED,
                "signature_invalid",
                "invalid webhook signature".to_string(),
            ),
            CoreError::OrderNotFound => {
                (StatusCode::NOT_FOUND, "order_not_found", self.0.to_string())
            }
            CoreError::AlreadyRefunded => (
                StatusCode::CONFLICT,
                "already_refunded",
                self.0.to_string(),
            ),
            CoreError::InvalidPaymentState(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_payment_state",
                self.0.to_string(),
            ),
            CoreError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                self.0.to_string(),
            ),
            CoreError::InsufficientRefundable { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_refundable",
                self.0.to_string(),
            ),
            CoreError::Gateway { .. } => {
                tracing::error!("gateway error: {}", self.0);
                (StatusCode::BAD_GATEWAY, "gateway_error", self.0.to_string())
            }
            CoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            CoreError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            CoreError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
