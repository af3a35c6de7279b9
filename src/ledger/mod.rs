//! The commission and wallet ledger.
//!
//! The free functions in the component modules take a [`UnitOfWork`] and stage
//! their writes in it; [`LedgerService`] owns the store, runs one request at a
//! time and commits each request's unit exactly once.
//!
//! [`UnitOfWork`]: crate::store::UnitOfWork

pub mod checkout;
pub mod client;
pub mod commission;
pub mod epin;
pub mod messages;
pub mod service;
pub mod settings;
pub mod top_up;
pub mod users;
pub mod wallet;

pub use checkout::OrderReceipt;
pub use client::LedgerClient;
pub use messages::*;
pub use service::LedgerService;
pub use settings::PlatformStats;

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Adds up amounts, failing instead of panicking when the total leaves the
/// `Decimal` range.
pub(crate) fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> LedgerResult<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| LedgerError::Validation("amount total out of range".to_string()))
}
