use std::collections::BTreeMap;
use tracing::debug;

use super::{KeyValueStore, Record, StoreError, StoreKey, StoreResult, WriteBatch};

/// Stages typed writes on top of a store and commits them as one batch.
///
/// Reads see staged writes first. Dropping a unit without calling
/// [`UnitOfWork::commit`] discards everything it staged.
pub struct UnitOfWork<'a> {
    store: &'a dyn KeyValueStore,
    staged: BTreeMap<StoreKey, Option<Vec<u8>>>,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    pub async fn load<R: Record>(&self, id: &str) -> StoreResult<Option<R>> {
        let key = StoreKey::new(R::BUCKET, id);
        let bytes = match self.staged.get(&key) {
            Some(staged) => staged.clone(),
            None => self.store.get(&key).await?,
        };
        bytes.map(|b| serde_json::from_slice(&b)).transpose().map_err(StoreError::from)
    }

    /// Every record in `R`'s bucket with staged writes applied, ordered by id.
    pub async fn scan<R: Record>(&self) -> StoreResult<Vec<R>> {
        let mut merged: BTreeMap<String, Vec<u8>> = self.store.scan(R::BUCKET).await?.into_iter().collect();
        for (key, value) in self.staged.iter().filter(|(key, _)| key.bucket == R::BUCKET) {
            match value {
                Some(bytes) => {
                    merged.insert(key.id.clone(), bytes.clone());
                }
                None => {
                    merged.remove(&key.id);
                }
            }
        }
        merged
            .values()
            .map(|bytes| serde_json::from_slice(bytes).map_err(StoreError::from))
            .collect()
    }

    /// Inserts or replaces a mutable record.
    pub fn put<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let key = record.store_key();
        if key.bucket.is_append_only() {
            return Err(StoreError::AppendOnly(key));
        }
        self.staged.insert(key, Some(serde_json::to_vec(record)?));
        Ok(())
    }

    /// Inserts a record that must not already exist.
    pub async fn append<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let key = record.store_key();
        if self.load::<R>(&key.id).await?.is_some() {
            return Err(StoreError::AppendOnly(key));
        }
        self.staged.insert(key, Some(serde_json::to_vec(record)?));
        Ok(())
    }

    pub fn delete<R: Record>(&mut self, id: &str) -> StoreResult<()> {
        let key = StoreKey::new(R::BUCKET, id);
        if key.bucket.is_append_only() {
            return Err(StoreError::AppendOnly(key));
        }
        self.staged.insert(key, None);
        Ok(())
    }

    pub async fn commit(self) -> StoreResult<usize> {
        let mut batch = WriteBatch::new();
        for (key, value) in self.staged {
            match value {
                Some(bytes) => batch.put(key, bytes),
                None => batch.delete(key),
            }
        }
        let writes = batch.len();
        if writes > 0 {
            self.store.commit(batch).await?;
        }
        debug!(writes, "Unit of work committed");
        Ok(writes)
    }
}
