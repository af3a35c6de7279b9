use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::wallet::WalletTransaction;
use crate::error::{LedgerError, LedgerResult};

/// Access level stored on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

/// Represents a registered member of the referral program.
///
/// `wallet_balance` is a cached projection of the user's wallet transactions.
/// It has no setter: the only way to move it is [`User::post`], which takes the
/// transaction being appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Upline user, absent for roots.
    pub referrer_id: Option<String>,
    /// Code other users enter at registration to name this user as their referrer.
    pub referral_code: String,
    wallet_balance: Decimal,
    pub joined_at: DateTime<Utc>,
}

/// Payload for registering a new user.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
}

impl Registration {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            referral_code: None,
        }
    }

    pub fn referred_by(mut self, code: impl Into<String>) -> Self {
        self.referral_code = Some(code.into());
        self
    }
}

impl User {
    /// Creates a user with a zero balance.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        referrer_id: Option<String>,
        referral_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            referrer_id,
            referral_code: referral_code.into(),
            wallet_balance: Decimal::ZERO,
            joined_at: Utc::now(),
        }
    }

    pub fn wallet_balance(&self) -> Decimal {
        self.wallet_balance
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Applies a ledger entry to the cached balance.
    ///
    /// The balance is left untouched when the entry belongs to another user or
    /// when the new balance would not fit in a `Decimal`.
    pub(crate) fn post(&mut self, entry: &WalletTransaction) -> LedgerResult<()> {
        if entry.user_id != self.id {
            return Err(LedgerError::InvariantViolation(format!(
                "entry {} posted to wrong user {}",
                entry.id, self.id
            )));
        }
        self.wallet_balance = self
            .wallet_balance
            .checked_add(entry.amount)
            .ok_or(LedgerError::InvalidAmount(entry.amount))?;
        Ok(())
    }
}
