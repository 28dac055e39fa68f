//! Analysis record persistence.
//!
//! The store is a plain string key/value capability. Records are stored as
//! JSON under `analysis:{repo}:{branch}` and replaced whole; a second key
//! `analysis-id:{id}` points an analysis id at its record key.

mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::AnalysisRecord;

/// Errors raised by a record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no storage directory available")]
    NoDirectory,
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Whole-value key/value persistence.
pub trait RecordStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;
    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;
    /// Delete `key`. Removing a missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// In-process store, used by tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.values.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.values.write().await.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.values.write().await.remove(key);
            Ok(())
        })
    }
}

/// Load the latest record stored under `key`.
pub async fn load_record(store: &dyn RecordStore, key: &str) -> Result<Option<AnalysisRecord>, StoreError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Persist `record` as the latest for its (repo, branch) and index its id.
/// The id key of the record it replaces is removed.
pub async fn save_record(store: &dyn RecordStore, record: &AnalysisRecord) -> Result<(), StoreError> {
    let key = record.key();
    let superseded = match load_record(store, &key).await {
        Ok(previous) => previous
            .map(|p| p.analysis_id)
            .filter(|id| *id != record.analysis_id),
        Err(StoreError::Corrupt { .. }) => None,
        Err(e) => return Err(e),
    };
    let json = serde_json::to_string(record)?;
    store.set(&key, json).await?;
    store
        .set(&AnalysisRecord::id_key(&record.analysis_id), key.clone())
        .await?;
    if let Some(old_id) = superseded {
        store.remove(&AnalysisRecord::id_key(&old_id)).await?;
    }
    tracing::debug!(key = %key, analysis_id = %record.analysis_id, "record saved");
    Ok(())
}

/// Load a record by analysis id. `None` if the id is unknown or its
/// (repo, branch) has since moved to another commit.
pub async fn load_by_id(store: &dyn RecordStore, analysis_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
    let Some(key) = store.get(&AnalysisRecord::id_key(analysis_id)).await? else {
        return Ok(None);
    };
    let record = load_record(store, &key).await?;
    Ok(record.filter(|r| r.analysis_id == analysis_id))
}
