//! Multi-level referral commission and wallet ledger, run as a set of actors.

pub mod actor_framework;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod store;
pub mod system;

#[cfg(test)]
mod mock_framework;

pub use config::{AppConfig, CargoEnv};
pub use error::{LedgerError, LedgerResult};
pub use logger::Logger;
pub use system::LedgerSystem;
