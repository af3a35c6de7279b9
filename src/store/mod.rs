//! Key-addressable persistence consumed by the ledger.
//!
//! The ledger only ever talks to [`KeyValueStore`]: point reads, bucket scans,
//! and atomic multi-key commits. Where the bytes live is the wiring's choice.

pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod unit_of_work;

pub use error::*;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::Record;
pub use unit_of_work::UnitOfWork;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type DynKeyValueStore = Arc<dyn KeyValueStore>;

/// Logical collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Users,
    Transactions,
    EPins,
    TopUps,
    Orders,
    Commissions,
    Carts,
    Settings,
}

impl Bucket {
    /// Buckets whose records may be written once and never changed or removed.
    pub fn is_append_only(self) -> bool {
        matches!(self, Bucket::Transactions | Bucket::Commissions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    pub bucket: Bucket,
    pub id: String,
}

impl StoreKey {
    pub fn new(bucket: Bucket, id: impl Into<String>) -> Self {
        Self { bucket, id: id.into() }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{}", self.bucket, self.id)
    }
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { key: StoreKey, value: Vec<u8> },
    Delete { key: StoreKey },
}

/// Writes that must land together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: StoreKey, value: Vec<u8>) {
        self.ops.push(WriteOp::Put { key, value });
    }

    pub fn delete(&mut self, key: StoreKey) {
        self.ops.push(WriteOp::Delete { key });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>>;

    /// Every `(id, value)` in the bucket, ordered by id.
    async fn scan(&self, bucket: Bucket) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Applies every op in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
