use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopUpStatus {
    Pending,
    Approved,
    Rejected,
}

/// Administrator verdict on a pending top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// A manual deposit claim backed by an external (bank/UPI) reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub external_reference: String,
    pub status: TopUpStatus,
    pub submitted_at: DateTime<Utc>,
}
