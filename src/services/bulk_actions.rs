use {
    crate::domain::{
        cashback::CashbackStatus,
        error::CoreError,
        gateway::{GatewayPayoutRequest, GatewayRegistry},
        money::MoneyAmount,
        order::{NewTimelineEntry, OrderStatus, PaymentMethod},
    },
    crate::infra::postgres::{cashback_repo, inventory_repo, order_repo},
    crate::services::cache::PendingCountCache,
    crate::services::notify::{Notifier, OrderStatusNotification},
    serde::{Deserialize, Serialize},
    sqlx::PgPool,
    std::collections::HashSet,
    uuid::Uuid,
};

/// Upper bound on one batch. Bigger requests get split by the caller.
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemError {
    pub id: Uuid,
    pub error: String,
}

/// Result of one batch: everything that validated was applied, everything
/// that did not is reported per item. One transaction either way — the
/// failures are skips, not rollbacks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<BulkItemError>,
}

impl BulkOutcome {
    fn new() -> Self {
        Self {
            success: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    fn ok(&mut self) {
        self.success += 1;
    }

    fn fail(&mut self, id: Uuid, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(BulkItemError {
            id,
            error: error.into(),
        });
    }
}

fn check_batch(ids: &[Uuid]) -> Result<(), CoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation("no ids in batch".into()));
    }
    if ids.len() > MAX_BATCH {
        return Err(CoreError::Validation(format!(
            "batch of {} exceeds the limit of {MAX_BATCH}",
            ids.len()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderAction {
    Confirm,
    Cancel { reason: String },
    MarkShipped,
}

impl OrderAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel { .. } => "cancel",
            Self::MarkShipped => "mark_shipped",
        }
    }

    fn resulting_status(&self) -> &'static str {
        match self {
            Self::Confirm => "confirmed",
            Self::Cancel { .. } => "cancelled",
            Self::MarkShipped => "dispatched",
        }
    }

    /// Statuses the action may be applied from.
    fn valid_from(&self) -> &'static [OrderStatus] {
        match self {
            Self::Confirm => &[OrderStatus::Placed],
            Self::Cancel { .. } => &[
                OrderStatus::Placed,
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
            ],
            Self::MarkShipped => &[
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ],
        }
    }
}

/// Apply one action to a batch of orders in a single transaction. Customer
/// notifications go out per applied order after the commit.
pub async fn bulk_order_action(
    pool: &PgPool,
    notifier: &Notifier,
    action: &OrderAction,
    ids: &[Uuid],
) -> Result<BulkOutcome, CoreError> {
    check_batch(ids)?;

    let mut outcome = BulkOutcome::new();
    let mut applied = Vec::new();
    let mut tx = pool.begin().await?;

    for &id in ids {
        let Some(order) = order_repo::get(&mut *tx, id).await? else {
            outcome.fail(id, "order not found");
            continue;
        };

        if !action.valid_from().contains(&order.status) {
            outcome.fail(
                id,
                format!("cannot {} order in status {}", action.name(), order.status),
            );
            continue;
        }

        match action {
            OrderAction::Confirm => {
                order_repo::set_status(&mut *tx, id, OrderStatus::Confirmed).await?;
                order_repo::append_timeline(
                    &mut *tx,
                    id,
                    &NewTimelineEntry::new("confirmed", "order confirmed by merchant"),
                )
                .await?;
            }
            OrderAction::Cancel { reason } => {
                order_repo::set_cancelled(&mut *tx, id, reason).await?;
                order_repo::append_timeline(
                    &mut *tx,
                    id,
                    &NewTimelineEntry::new("cancelled", format!("order cancelled: {reason}")),
                )
                .await?;
                // Cancelled units go back on the shelf.
                for item in order_repo::items(&mut *tx, id).await? {
                    inventory_repo::restore_for_item(&mut *tx, &item).await?;
                }
            }
            OrderAction::MarkShipped => {
                order_repo::set_status(&mut *tx, id, OrderStatus::Dispatched).await?;
                order_repo::append_timeline(
                    &mut *tx,
                    id,
                    &NewTimelineEntry::new("dispatched", "order handed to delivery"),
                )
                .await?;
            }
        }
        applied.push(OrderStatusNotification {
            order_id: id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: action.resulting_status().to_string(),
        });
        outcome.ok();
    }

    tx.commit().await?;

    for notification in &applied {
        notifier.order_status_changed(notification).await;
    }

    tracing::info!(
        action = action.name(),
        success = outcome.success,
        failed = outcome.failed,
        "bulk order action applied"
    );
    Ok(outcome)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CashbackDecision {
    Approve {
        /// Defaults to the requested amount.
        amount: Option<MoneyAmount>,
        notes: Option<String>,
    },
    Reject {
        notes: Option<String>,
    },
}

/// Decide a batch of pending cashback requests in one transaction. Already
/// decided requests are reported per item, never redecided.
pub async fn bulk_cashback_decision(
    pool: &PgPool,
    cache: &PendingCountCache,
    decision: &CashbackDecision,
    ids: &[Uuid],
) -> Result<BulkOutcome, CoreError> {
    check_batch(ids)?;

    let mut outcome = BulkOutcome::new();
    let mut touched_merchants = HashSet::new();
    let mut tx = pool.begin().await?;

    for &id in ids {
        let Some(request) = cashback_repo::get(&mut *tx, id).await? else {
            outcome.fail(id, "cashback request not found");
            continue;
        };

        let (target, amount, notes) = match decision {
            CashbackDecision::Approve { amount, notes } => (
                CashbackStatus::Approved,
                Some(amount.unwrap_or(request.requested_amount)),
                notes.as_deref(),
            ),
            CashbackDecision::Reject { notes } => {
                (CashbackStatus::Rejected, None, notes.as_deref())
            }
        };

        if !request.status.can_transition_to(target) {
            outcome.fail(
                id,
                format!("request {} is already {}", request.request_number, request.status),
            );
            continue;
        }

        cashback_repo::set_decision(&mut *tx, id, target, amount, notes).await?;
        touched_merchants.insert(request.merchant_id);
        outcome.ok();
    }

    tx.commit().await?;

    for merchant_id in touched_merchants {
        cache.invalidate(merchant_id).await;
    }

    tracing::info!(
        success = outcome.success,
        failed = outcome.failed,
        "bulk cashback decision applied"
    );
    Ok(outcome)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutReceipt {
    pub request_id: Uuid,
    pub payout_id: String,
    pub amount: MoneyAmount,
}

/// Pay out a single approved cashback request through the payout rail.
pub async fn mark_cashback_paid(
    pool: &PgPool,
    gateways: &GatewayRegistry,
    cache: &PendingCountCache,
    id: Uuid,
) -> Result<PayoutReceipt, CoreError> {
    let request = cashback_repo::get(pool, id)
        .await?
        .ok_or_else(|| CoreError::Validation("cashback request not found".into()))?;

    if !request.status.can_transition_to(CashbackStatus::Paid) {
        return Err(CoreError::InvalidPaymentState(format!(
            "request {} is {}, only approved requests can be paid",
            request.request_number, request.status
        )));
    }

    let amount = request.approved_amount.unwrap_or(request.requested_amount);
    let payout = gateways
        .for_method(PaymentMethod::Razorpay)
        .create_payout(GatewayPayoutRequest {
            reference: request.request_number.clone(),
            recipient: request.customer_id.to_string(),
            amount,
            currency: crate::domain::money::Currency::Inr,
            narration: format!("cashback {}", request.request_number),
        })
        .await?;

    cashback_repo::mark_paid(pool, id, &payout.payout_id).await?;
    cache.invalidate(request.merchant_id).await;

    tracing::info!(
        request_id = %id,
        payout_id = %payout.payout_id,
        amount = amount.minor_units(),
        "cashback paid out"
    );

    Ok(PayoutReceipt {
        request_id: id,
        payout_id: payout.payout_id,
        amount,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCount {
    pub count: i64,
    pub cached: bool,
}

/// Pending count for a merchant's dashboard badge, served from the TTL
/// cache when fresh.
pub async fn pending_cashbacks(
    pool: &PgPool,
    cache: &PendingCountCache,
    merchant_id: Uuid,
) -> Result<PendingCount, CoreError> {
    if let Some(count) = cache.get(merchant_id).await {
        return Ok(PendingCount {
            count,
            cached: true,
        });
    }

    let count = cashback_repo::pending_count(pool, merchant_id).await?;
    cache.put(merchant_id, count).await;
    Ok(PendingCount {
        count,
        cached: false,
    })
}
