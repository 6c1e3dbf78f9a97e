pub mod cashback_repo;
pub mod inventory_repo;
pub mod order_repo;
pub mod refund_repo;
pub mod webhook_log_repo;

use {
    crate::domain::error::CoreError,
    sqlx::{Postgres, Transaction},
    uuid::Uuid,
};

/// Serialize all money-moving work for one order. Transaction-scoped
/// advisory lock, released automatically on commit or rollback.
pub async fn lock_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<(), CoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(order_id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}
