use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single-use prepaid code redeemable for a fixed wallet credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EPin {
    pub code: String,
    pub amount: Decimal,
    pub is_used: bool,
    pub issued_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
}

impl EPin {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }
}
