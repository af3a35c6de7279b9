use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed set of reasons a wallet balance can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    PurchaseDebit,
    CommissionCredit,
    EPinCredit,
    TopUpCredit,
    AdminAdjustment,
}

impl TransactionKind {
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            TransactionKind::CommissionCredit | TransactionKind::EPinCredit | TransactionKind::TopUpCredit
        )
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionKind::PurchaseDebit => "purchase-debit",
            TransactionKind::CommissionCredit => "commission-credit",
            TransactionKind::EPinCredit => "e-pin-credit",
            TransactionKind::TopUpCredit => "top-up-credit",
            TransactionKind::AdminAdjustment => "admin-adjustment",
        };
        f.write_str(name)
    }
}

/// Immutable ledger entry. `amount` is signed: credits positive, debits negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Direction of a manual administrator adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Credit,
    /// May take the balance below zero.
    Debit,
}
