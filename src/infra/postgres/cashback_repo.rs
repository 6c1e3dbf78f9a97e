use {
    crate::domain::{
        cashback::{CashbackRequest, CashbackStatus},
        error::CoreError,
        money::MoneyAmount,
    },
    sqlx::{PgExecutor, Row, postgres::PgRow},
    uuid::Uuid,
};

fn request_from_row(row: PgRow) -> Result<CashbackRequest, CoreError> {
    let status: String = row.try_get("status")?;
    let approved: Option<i64> = row.try_get("approved_amount")?;
    Ok(CashbackRequest {
        id: row.try_get("id")?,
        request_number: row.try_get("request_number")?,
        merchant_id: row.try_get("merchant_id")?,
        customer_id: row.try_get("customer_id")?,
        requested_amount: MoneyAmount::new(row.try_get("requested_amount")?)?,
        approved_amount: approved.map(MoneyAmount::new).transpose()?,
        status: CashbackStatus::try_from(status.as_str())?,
        payout_id: row.try_get("payout_id")?,
        paid_at: row.try_get("paid_at")?,
    })
}

pub async fn get<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
) -> Result<Option<CashbackRequest>, CoreError> {
    let row = sqlx::query(
        "SELECT id, request_number, merchant_id, customer_id, requested_amount, \
         approved_amount, status, payout_id, paid_at FROM cashback_requests WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;
    row.map(request_from_row).transpose()
}

pub async fn set_decision<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    status: CashbackStatus,
    approved_amount: Option<MoneyAmount>,
    notes: Option<&str>,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE cashback_requests SET status = $2, approved_amount = $3, notes = $4, \
         updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(approved_amount.map(|a| a.minor_units()))
    .bind(notes)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn mark_paid<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    payout_id: &str,
) -> Result<(), CoreError> {
    sqlx::query(
        "UPDATE cashback_requests SET status = 'paid', payout_id = $2, paid_at = now(), \
         updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(payout_id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn pending_count<'e, E: PgExecutor<'e>>(
    exec: E,
    merchant_id: Uuid,
) -> Result<i64, CoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM cashback_requests WHERE merchant_id = $1 AND status = 'pending'",
    )
    .bind(merchant_id)
    .fetch_one(exec)
    .await?;
    Ok(count)
}
