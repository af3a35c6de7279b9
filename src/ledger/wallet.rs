//! Wallet Ledger: the append-only transaction log and the cached balance it
//! projects onto each user record.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, error};

use super::{checked_sum, new_id, users};
use crate::domain::{Adjustment, TransactionKind, User, WalletTransaction};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

fn require_positive(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Appends the entry and moves the cached balance in the same unit.
///
/// Every balance change in the crate goes through here.
async fn post(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    signed_amount: Decimal,
    kind: TransactionKind,
    description: String,
) -> LedgerResult<WalletTransaction> {
    let mut user = users::load_user(uow, user_id).await?;
    let entry = WalletTransaction {
        id: new_id(),
        user_id: user_id.to_string(),
        amount: signed_amount,
        kind,
        description,
        timestamp: Utc::now(),
    };
    user.post(&entry)?;
    uow.append(&entry).await?;
    uow.put(&user)?;
    debug!(user_id, amount = %signed_amount, %kind, balance = %user.wallet_balance(), "Posted");
    Ok(entry)
}

pub async fn credit(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    amount: Decimal,
    kind: TransactionKind,
    description: impl Into<String>,
) -> LedgerResult<WalletTransaction> {
    require_positive(amount)?;
    if !kind.is_credit() {
        return Err(LedgerError::Validation(format!("{} is not a credit kind", kind)));
    }
    post(uow, user_id, amount, kind, description.into()).await
}

/// Purchase debit. Fails with `InsufficientFunds` rather than going negative.
pub async fn debit(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    amount: Decimal,
    description: impl Into<String>,
) -> LedgerResult<WalletTransaction> {
    require_positive(amount)?;
    let available = balance(uow, user_id).await?;
    if amount > available {
        return Err(LedgerError::InsufficientFunds {
            user_id: user_id.to_string(),
            requested: amount,
            available,
        });
    }
    post(uow, user_id, -amount, TransactionKind::PurchaseDebit, description.into()).await
}

/// Manual administrator correction. A debit here skips the sufficiency check
/// and may leave the balance negative.
pub async fn adjust(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    direction: Adjustment,
    amount: Decimal,
    description: impl Into<String>,
) -> LedgerResult<WalletTransaction> {
    require_positive(amount)?;
    let signed = match direction {
        Adjustment::Credit => amount,
        Adjustment::Debit => -amount,
    };
    post(uow, user_id, signed, TransactionKind::AdminAdjustment, description.into()).await
}

pub async fn balance(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Decimal> {
    Ok(users::load_user(uow, user_id).await?.wallet_balance())
}

/// The user's transactions, oldest first.
pub async fn history(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Vec<WalletTransaction>> {
    let mut entries: Vec<WalletTransaction> = uow
        .scan::<WalletTransaction>()
        .await?
        .into_iter()
        .filter(|t| t.user_id == user_id)
        .collect();
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    Ok(entries)
}

fn check_projection(user: &User, ledger_sum: Decimal) -> LedgerResult<Decimal> {
    if user.wallet_balance() != ledger_sum {
        error!(
            user_id = %user.id,
            cached = %user.wallet_balance(),
            ledger = %ledger_sum,
            "Wallet balance diverged from ledger"
        );
        return Err(LedgerError::InvariantViolation(format!(
            "balance of {} is {} but ledger sums to {}",
            user.id,
            user.wallet_balance(),
            ledger_sum
        )));
    }
    Ok(ledger_sum)
}

/// Recomputes the balance from the full history and checks it against the cache.
pub async fn reconcile(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Decimal> {
    let user = users::load_user(uow, user_id).await?;
    let sum = checked_sum(history(uow, user_id).await?.iter().map(|t| t.amount))?;
    check_projection(&user, sum)
}

/// Reconciles every user in one pass. Returns how many users were checked.
pub async fn reconcile_all(uow: &UnitOfWork<'_>) -> LedgerResult<usize> {
    let mut sums: HashMap<String, Decimal> = HashMap::new();
    for entry in uow.scan::<WalletTransaction>().await? {
        let sum = sums.entry(entry.user_id).or_default();
        *sum = checked_sum([*sum, entry.amount])?;
    }
    let users = uow.scan::<User>().await?;
    for user in &users {
        check_projection(user, sums.get(&user.id).copied().unwrap_or_default())?;
    }
    Ok(users.len())
}
