use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::warn;

use crate::error::{MedMinderError, Result};
use crate::interfaces::storage::FileStorage;

/// One entity collection: a watch cell holding the current full snapshot,
/// backed by a single storage blob.
///
/// Reads go straight to the cell and never block. Mutations are serialized
/// by `write_lock` because the read-modify-publish-persist sequence is not
/// atomic; two unserialized writers would silently drop one update.
pub(crate) struct Collection<T> {
    file_name: &'static str,
    storage: Arc<dyn FileStorage>,
    cell: watch::Sender<Vec<T>>,
    write_lock: Mutex<()>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(file_name: &'static str, storage: Arc<dyn FileStorage>) -> Self {
        let (cell, _) = watch::channel(Vec::new());
        Self {
            file_name,
            storage,
            cell,
            write_lock: Mutex::new(()),
        }
    }

    /// Fills the cell from storage. A missing or unparseable blob loads as
    /// an empty collection; storage trouble is logged, never propagated.
    pub async fn load(&self) {
        let records = match self.storage.read_text(self.file_name).await {
            Ok(Some(content)) => match serde_json::from_str::<Vec<T>>(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = self.file_name, error = %e, "corrupt collection blob, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(file = self.file_name, error = %e, "unreadable collection blob, starting empty");
                Vec::new()
            }
        };
        self.cell.send_replace(records);
    }

    /// Current full snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        self.cell.borrow().clone()
    }

    /// Subscribers see the latest full snapshot on every mutation; the cell
    /// is a single slot, intermediate values may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.cell.subscribe()
    }

    /// Runs `f` over a copy of the current list, publishes the result, then
    /// persists it as one whole-blob write. The new snapshot is visible to
    /// readers before the write lands; if the write fails the in-memory
    /// state stays ahead of the blob until the next successful persist.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.cell.borrow().clone();
        let out = f(&mut records);
        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| MedMinderError::Storage(e.to_string()))?;
        self.cell.send_replace(records);
        self.storage.write_text(self.file_name, &content).await?;
        Ok(out)
    }
}

/// Next id for a collection: max + 1, or 1 when empty. Freed ids below the
/// maximum are not reassigned.
pub(crate) fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().map_or(1, |max| max + 1)
}
