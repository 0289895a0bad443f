use crate::daily::DailyRecords;
use crate::storage::StoreResult;
use tracing::{debug, info};

/// Deletes every document in the user's collection. Returns how many were
/// removed.
pub async fn clear_all(records: &DailyRecords) -> StoreResult<usize> {
    let store = records.store();
    let collection = records.collection();
    let documents = store.list(collection).await;
    info!("found {} documents to delete", documents.len());

    for (key, _) in &documents {
        debug!(%key, "deleting document");
        store.delete(collection, key).await?;
    }

    info!("deleted {} documents", documents.len());
    Ok(documents.len())
}
