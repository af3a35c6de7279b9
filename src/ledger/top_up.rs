//! Top-Up Request Queue: manual deposits adjudicated by an administrator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::{new_id, users, wallet};
use crate::domain::{Decision, TopUpRequest, TopUpStatus, TransactionKind};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

#[instrument(skip(uow))]
pub async fn submit(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    amount: Decimal,
    external_reference: &str,
    now: DateTime<Utc>,
) -> LedgerResult<TopUpRequest> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let external_reference = external_reference.trim();
    if external_reference.is_empty() {
        return Err(LedgerError::Validation("external reference is required".to_string()));
    }
    users::load_user(uow, user_id).await?;

    let request = TopUpRequest {
        id: new_id(),
        user_id: user_id.to_string(),
        amount,
        external_reference: external_reference.to_string(),
        status: TopUpStatus::Pending,
        submitted_at: now,
    };
    uow.put(&request)?;
    info!(request_id = %request.id, "Top-up submitted");
    Ok(request)
}

/// Settles a pending request. Approval credits the claimed amount.
#[instrument(skip(uow))]
pub async fn adjudicate(
    uow: &mut UnitOfWork<'_>,
    request_id: &str,
    decision: Decision,
) -> LedgerResult<TopUpRequest> {
    let mut request = uow
        .load::<TopUpRequest>(request_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("top-up request", request_id))?;
    if request.status != TopUpStatus::Pending {
        return Err(LedgerError::AlreadyDecided(request.id));
    }

    request.status = match decision {
        Decision::Approve => {
            wallet::credit(
                uow,
                &request.user_id,
                request.amount,
                TransactionKind::TopUpCredit,
                format!("UPI Approved (Ref: {})", request.external_reference),
            )
            .await?;
            TopUpStatus::Approved
        }
        Decision::Reject => TopUpStatus::Rejected,
    };
    uow.put(&request)?;
    info!(status = ?request.status, "Top-up decided");
    Ok(request)
}

/// Requests awaiting a decision, oldest first.
pub async fn pending(uow: &UnitOfWork<'_>) -> LedgerResult<Vec<TopUpRequest>> {
    let mut requests: Vec<TopUpRequest> = uow
        .scan::<TopUpRequest>()
        .await?
        .into_iter()
        .filter(|r| r.status == TopUpStatus::Pending)
        .collect();
    requests.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
    Ok(requests)
}

/// Every request a user has submitted, newest first.
pub async fn for_user(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Vec<TopUpRequest>> {
    let mut requests: Vec<TopUpRequest> = uow
        .scan::<TopUpRequest>()
        .await?
        .into_iter()
        .filter(|r| r.user_id == user_id)
        .collect();
    requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    Ok(requests)
}
