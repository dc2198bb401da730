use std::collections::HashMap;
use std::sync::Arc;

use chatdrive_core::{Backend, BackendError, FileEntry, FolderId};
use tokio::sync::{RwLock, watch};

#[derive(Debug, Clone)]
struct CachedListing {
    files: Arc<Vec<FileEntry>>,
    stale: bool,
}

/// Per-folder file listings with stale tracking.
///
/// Every invalidation bumps a generation counter so viewers subscribed via
/// [`ListingCache::subscribe`] know to refetch. The counter only moves while
/// the entries write lock is held.
pub struct ListingCache {
    entries: RwLock<HashMap<FolderId, CachedListing>>,
    generation: watch::Sender<u64>,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingCache {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            generation,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub async fn invalidate(&self, folder: FolderId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&folder) {
            entry.stale = true;
        }
        self.bump();
        drop(entries);
        tracing::debug!(?folder, "listing invalidated");
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        for entry in entries.values_mut() {
            entry.stale = true;
        }
        self.bump();
    }

    /// True when the folder has never been loaded or was invalidated.
    pub async fn is_stale(&self, folder: FolderId) -> bool {
        self.entries
            .read()
            .await
            .get(&folder)
            .is_none_or(|entry| entry.stale)
    }

    /// Last loaded listing, stale or not.
    pub async fn cached(&self, folder: FolderId) -> Option<Arc<Vec<FileEntry>>> {
        self.entries
            .read()
            .await
            .get(&folder)
            .map(|entry| entry.files.clone())
    }

    /// Returns the cached listing, refetching it first when stale.
    ///
    /// An invalidation that lands while the fetch is running leaves the
    /// stored result stale, so the next load fetches again.
    pub async fn load(
        &self,
        backend: &dyn Backend,
        folder: FolderId,
    ) -> Result<Arc<Vec<FileEntry>>, BackendError> {
        let observed = {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&folder) {
                if !entry.stale {
                    return Ok(entry.files.clone());
                }
            }
            self.generation()
        };

        let files = Arc::new(backend.list_files(folder).await?);

        let mut entries = self.entries.write().await;
        let stale = self.generation() != observed;
        if stale {
            tracing::debug!(?folder, "listing invalidated during fetch");
        }
        entries.insert(
            folder,
            CachedListing {
                files: files.clone(),
                stale,
            },
        );
        Ok(files)
    }

    fn bump(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}
