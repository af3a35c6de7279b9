use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Bucket, KeyValueStore, StoreKey, StoreResult, WriteBatch, WriteOp};

/// In-process store. A commit holds the write lock for the whole batch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<StoreKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn apply(entries: &mut BTreeMap<StoreKey, Vec<u8>>, batch: WriteBatch) {
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn scan(&self, bucket: Bucket) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.bucket == bucket)
            .map(|(key, value)| (key.id.clone(), value.clone()))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        Self::apply(&mut entries, batch);
        Ok(())
    }
}
