use serde::{de::DeserializeOwned, Serialize};

use super::{Bucket, StoreKey};
use crate::domain::{Cart, CommissionLog, EPin, LedgerSettings, Order, TopUpRequest, User, WalletTransaction};

/// A persisted entity: which bucket it lives in and the id it is stored under.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const BUCKET: Bucket;

    fn record_id(&self) -> String;

    fn store_key(&self) -> StoreKey {
        StoreKey::new(Self::BUCKET, self.record_id())
    }
}

impl Record for User {
    const BUCKET: Bucket = Bucket::Users;
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for WalletTransaction {
    const BUCKET: Bucket = Bucket::Transactions;
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for EPin {
    const BUCKET: Bucket = Bucket::EPins;
    fn record_id(&self) -> String {
        self.code.clone()
    }
}

impl Record for TopUpRequest {
    const BUCKET: Bucket = Bucket::TopUps;
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for Order {
    const BUCKET: Bucket = Bucket::Orders;
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for CommissionLog {
    const BUCKET: Bucket = Bucket::Commissions;
    fn record_id(&self) -> String {
        self.id.clone()
    }
}

impl Record for Cart {
    const BUCKET: Bucket = Bucket::Carts;
    fn record_id(&self) -> String {
        self.user_id.clone()
    }
}

/// Program settings are a singleton.
pub const SETTINGS_ID: &str = "global";

impl Record for LedgerSettings {
    const BUCKET: Bucket = Bucket::Settings;
    fn record_id(&self) -> String {
        SETTINGS_ID.to_string()
    }
}
