use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Bucket, KeyValueStore, MemoryStore, StoreKey, StoreResult, WriteBatch};

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    bucket: Bucket,
    id: String,
    value: serde_json::Value,
}

/// Whole-state JSON file. Each commit rewrites a sibling temp file and renames
/// it over the live file, so a crash leaves either the old or the new state.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<StoreKey, Vec<u8>>>,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: Vec<FileEntry> = serde_json::from_slice(&bytes)?;
                let mut entries = BTreeMap::new();
                for entry in file {
                    entries.insert(StoreKey::new(entry.bucket, entry.id), serde_json::to_vec(&entry.value)?);
                }
                entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), records = entries.len(), "Opened JSON store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &BTreeMap<StoreKey, Vec<u8>>) -> StoreResult<()> {
        let mut file = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            file.push(FileEntry {
                bucket: key.bucket,
                id: key.id.clone(),
                value: serde_json::from_slice(value)?,
            });
        }
        let bytes = serde_json::to_vec_pretty(&file)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(records = entries.len(), "Persisted JSON store");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn scan(&self, bucket: Bucket) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.bucket == bucket)
            .map(|(key, value)| (key.id.clone(), value.clone()))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        MemoryStore::apply(&mut next, batch);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}
