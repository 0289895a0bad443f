use crate::models::DailyRecord;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs,
    sync::{Mutex, broadcast},
};
use tracing::error;

const CHANGE_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode data file: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the store persists: collection path -> document key -> document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    pub collections: BTreeMap<String, BTreeMap<String, DailyRecord>>,
}

/// Emitted after every committed write or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub collection: String,
    pub key: String,
}

/// A collection-of-documents store kept in memory and mirrored to a single
/// JSON file. Each mutation is persisted before it becomes visible; a failed
/// persist leaves the in-memory state untouched.
#[derive(Clone)]
pub struct DocumentStore {
    data_path: Option<PathBuf>,
    data: Arc<Mutex<StoreData>>,
    changes: broadcast::Sender<DocumentChange>,
}

impl DocumentStore {
    pub fn new(data_path: PathBuf, data: StoreData) -> Self {
        Self::build(Some(data_path), data)
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::build(None, StoreData::default())
    }

    fn build(data_path: Option<PathBuf>, data: StoreData) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            changes,
        }
    }

    pub async fn get(&self, collection: &str, key: &str) -> Option<DailyRecord> {
        let data = self.data.lock().await;
        data.collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    /// Snapshot of every document in `collection`, ordered by key.
    pub async fn list(&self, collection: &str) -> Vec<(String, DailyRecord)> {
        let data = self.data.lock().await;
        data.collections
            .get(collection)
            .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Replaces the whole document at `key`.
    pub async fn set(&self, collection: &str, key: &str, doc: DailyRecord) -> StoreResult<()> {
        self.commit(collection, key, |docs| {
            docs.insert(key.to_string(), doc);
        })
        .await
    }

    /// Applies `update` to the existing document, or to `create()` when no
    /// document exists yet, and stores the result. Returns the stored document.
    pub async fn upsert<C, U>(
        &self,
        collection: &str,
        key: &str,
        create: C,
        update: U,
    ) -> StoreResult<DailyRecord>
    where
        C: FnOnce() -> DailyRecord,
        U: FnOnce(&mut DailyRecord),
    {
        let mut stored = None;
        self.commit(collection, key, |docs| {
            let doc = docs.entry(key.to_string()).or_insert_with(create);
            update(doc);
            stored = Some(doc.clone());
        })
        .await?;
        Ok(stored.unwrap_or_else(|| DailyRecord::empty(key)))
    }

    pub async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.commit(collection, key, |docs| {
            docs.remove(key);
        })
        .await
    }

    pub fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }

    async fn commit<F>(&self, collection: &str, key: &str, mutate: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, DailyRecord>),
    {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let docs = next.collections.entry(collection.to_string()).or_default();
        mutate(&mut *docs);
        if docs.is_empty() {
            next.collections.remove(collection);
        }

        if let Some(path) = &self.data_path {
            if let Err(err) = persist_data(path, &next).await {
                error!("failed to persist {collection}/{key}: {err}");
                return Err(err);
            }
        }
        *data = next;
        drop(data);

        // No receivers is fine: nobody is subscribed.
        let _ = self.changes.send(DocumentChange {
            collection: collection.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }
}

pub async fn load_data(path: &Path) -> StoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                StoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            StoreData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> StoreResult<()> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
