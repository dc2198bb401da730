use std::path::PathBuf;
use std::sync::Arc;

use chatdrive_core::{Backend, BackendError, BandwidthStats, FileEntry, FolderId};
use tokio::sync::Mutex;

use crate::listing::ListingCache;
use crate::moves::{self, MoveResolver};
use crate::prompt::{ConfirmRequest, Notifier, Prompter};
use crate::search::SearchCoordinator;
use crate::selection::SelectionSet;
use crate::session::SessionManager;
use crate::transfer::{QueueError, TransferEngine, TransferId, TransferRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkReport {
    fn record<T, E>(&mut self, result: &Result<T, E>) {
        if result.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Shared handles the façade is built from.
pub struct FacadeParts {
    pub backend: Arc<dyn Backend>,
    pub session: Arc<SessionManager>,
    pub listings: Arc<ListingCache>,
    pub prompter: Arc<dyn Prompter>,
    pub notifier: Arc<dyn Notifier>,
    pub uploads: Arc<TransferEngine>,
    pub downloads: Arc<TransferEngine>,
    pub search: Arc<SearchCoordinator>,
}

/// One-call entry points for file actions in the active folder.
pub struct OperationFacade {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
    listings: Arc<ListingCache>,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
    uploads: Arc<TransferEngine>,
    downloads: Arc<TransferEngine>,
    search: Arc<SearchCoordinator>,
    moves: MoveResolver,
    selection: Mutex<SelectionSet>,
}

impl OperationFacade {
    pub fn new(parts: FacadeParts) -> Self {
        let moves = MoveResolver::new(
            parts.backend.clone(),
            parts.listings.clone(),
            parts.notifier.clone(),
        );
        let selection = Mutex::new(SelectionSet::new(parts.session.active_folder()));
        Self {
            backend: parts.backend,
            session: parts.session,
            listings: parts.listings,
            prompter: parts.prompter,
            notifier: parts.notifier,
            uploads: parts.uploads,
            downloads: parts.downloads,
            search: parts.search,
            moves,
            selection,
        }
    }

    pub fn uploads(&self) -> &Arc<TransferEngine> {
        &self.uploads
    }

    pub fn downloads(&self) -> &Arc<TransferEngine> {
        &self.downloads
    }

    pub fn active_folder(&self) -> FolderId {
        self.session.active_folder()
    }

    pub async fn select_folder(&self, folder: FolderId) {
        self.session.set_active_folder(folder);
        self.selection.lock().await.retarget(folder);
    }

    /// Ctrl-click. Returns whether `id` is selected afterwards.
    pub async fn toggle_selection(&self, id: i64) -> bool {
        self.current_selection().await.toggle(id)
    }

    pub async fn select_only(&self, id: i64) {
        self.current_selection().await.select_only(id);
    }

    pub async fn clear_selection(&self) {
        self.selection.lock().await.clear();
    }

    pub async fn selection(&self) -> Vec<i64> {
        self.current_selection().await.ids().to_vec()
    }

    /// Listing of the active folder, refetched when stale.
    pub async fn listing(&self) -> Result<Arc<Vec<FileEntry>>, BackendError> {
        self.listings
            .load(self.backend.as_ref(), self.active_folder())
            .await
    }

    /// Returns `Ok(false)` when the user declined.
    pub async fn delete(&self, id: i64) -> Result<bool, BackendError> {
        let confirmed = self
            .prompter
            .confirm(ConfirmRequest::danger(
                "Delete File",
                "Are you sure you want to delete this file?",
                "Delete",
            ))
            .await;
        if !confirmed {
            return Ok(false);
        }
        let folder = self.active_folder();
        match self.backend.delete_file(id, folder).await {
            Ok(()) => {
                self.listings.invalidate(folder).await;
                self.notifier.success("File deleted");
                Ok(true)
            }
            Err(err) => {
                self.notifier.error(&format!("Delete failed: {err}"));
                Err(err)
            }
        }
    }

    /// Downloads right away, outside the queue. Returns `Ok(false)` when
    /// the save prompt was dismissed.
    pub async fn download(&self, id: i64, name: &str) -> Result<bool, BackendError> {
        let Some(save_path) = self.prompter.pick_save_path(name).await else {
            return Ok(false);
        };
        let folder = self.active_folder();
        self.notifier.info(&format!("Download started: {name}"));
        match self.backend.download_file(id, &save_path, folder).await {
            Ok(()) => {
                self.listings.invalidate(folder).await;
                self.notifier
                    .success(&format!("Download complete: {name}"));
                Ok(true)
            }
            Err(err) => {
                self.notifier.error(&format!("Download failed: {err}"));
                Err(err)
            }
        }
    }

    /// Deletes every selected item one after another. `None` when there
    /// was nothing selected or the user declined.
    pub async fn bulk_delete(&self) -> Option<BulkReport> {
        let ids = self.selection().await;
        if ids.is_empty() {
            return None;
        }
        let confirmed = self
            .prompter
            .confirm(ConfirmRequest::danger(
                "Delete Files",
                format!("Are you sure you want to delete {} files?", ids.len()),
                "Delete All",
            ))
            .await;
        if !confirmed {
            return None;
        }

        let folder = self.active_folder();
        let mut report = BulkReport::default();
        for id in ids {
            let result = self.backend.delete_file(id, folder).await;
            if let Err(err) = &result {
                tracing::warn!(id, error = %err, "bulk delete item failed");
            }
            report.record(&result);
        }

        self.clear_selection().await;
        self.listings.invalidate(folder).await;
        if report.succeeded > 0 {
            self.notifier
                .success(&format!("Deleted {} files.", report.succeeded));
        }
        if report.failed > 0 {
            self.notifier
                .error(&format!("Failed to delete {} files.", report.failed));
        }
        Some(report)
    }

    /// Downloads the selected items of the active listing into one
    /// directory. `None` when nothing was selected or no directory chosen.
    pub async fn bulk_download(&self) -> Option<BulkReport> {
        let ids = self.selection().await;
        if ids.is_empty() {
            return None;
        }
        let directory = self
            .prompter
            .pick_directory("Select Download Destination")
            .await?;

        let listing = match self.listing().await {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(error = %err, "listing refresh failed; using cached entries");
                self.listings
                    .cached(self.active_folder())
                    .await
                    .unwrap_or_default()
            }
        };
        let files: Vec<FileEntry> = ids
            .iter()
            .filter_map(|id| listing.iter().find(|file| file.id == *id).cloned())
            .collect();
        let missing = ids.len() - files.len();
        if missing > 0 {
            tracing::warn!(missing, "selected items absent from the loaded listing");
        }

        self.notifier
            .info(&format!("Starting batch download of {} files...", files.len()));
        let mut report = self.download_all(&files, directory).await;
        report.failed += missing;
        self.clear_selection().await;
        self.notifier
            .success(&format!("Downloaded {} files.", report.succeeded));
        Some(report)
    }

    /// Downloads the whole active listing into one directory.
    pub async fn download_folder(&self) -> Option<BulkReport> {
        let listing = match self.listing().await {
            Ok(listing) => listing,
            Err(err) => {
                self.notifier.error(&format!("Error: {err}"));
                return None;
            }
        };
        if listing.is_empty() {
            self.notifier.info("Folder is empty.");
            return Some(BulkReport::default());
        }
        let directory = self.prompter.pick_directory("Download Folder To...").await?;

        self.notifier.info(&format!(
            "Downloading folder contents ({} files)...",
            listing.len()
        ));
        let report = self.download_all(&listing, directory).await;
        self.notifier.success(&format!(
            "Folder Download Complete: {} files.",
            report.succeeded
        ));
        Some(report)
    }

    /// Drag-and-drop of `dragged` onto `target`.
    pub async fn move_dropped(&self, dragged: i64, target: FolderId) -> Result<usize, BackendError> {
        let mut selection = self.current_selection().await;
        let plan = moves::resolve(&selection, dragged, target, self.active_folder());
        self.moves.execute(&plan, &mut selection).await
    }

    /// Move dialog: the whole selection goes to `target`.
    pub async fn move_selection(&self, target: FolderId) -> Result<usize, BackendError> {
        let mut selection = self.current_selection().await;
        let plan = moves::resolve_selection(&selection, target, self.active_folder());
        self.moves.execute(&plan, &mut selection).await
    }

    /// Picked or dropped local files go to the upload queue for the active
    /// folder.
    pub async fn queue_uploads(&self, paths: Vec<PathBuf>) -> Result<Vec<TransferId>, QueueError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let folder = self.active_folder();
        let count = paths.len();
        let ids = self
            .uploads
            .enqueue_many(
                paths
                    .into_iter()
                    .map(|path| (TransferRequest::upload(path), folder))
                    .collect(),
            )
            .await?;
        self.notifier
            .info(&format!("Queued {count} files for upload"));
        Ok(ids)
    }

    /// Queues a download; the save path is asked for when it starts.
    pub async fn queue_download(&self, id: i64, name: &str) -> Result<TransferId, QueueError> {
        self.downloads
            .enqueue(TransferRequest::download(id, name), self.active_folder())
            .await
    }

    /// Queues downloads into one directory chosen now. `Ok(None)` when the
    /// directory prompt was dismissed.
    pub async fn queue_bulk_download(
        &self,
        files: &[FileEntry],
    ) -> Result<Option<Vec<TransferId>>, QueueError> {
        if files.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let Some(directory) = self
            .prompter
            .pick_directory("Select Download Destination")
            .await
        else {
            return Ok(None);
        };
        let folder = self.active_folder();
        let requests = files
            .iter()
            .map(|file| {
                (
                    TransferRequest::download_into(file.id, file.name.clone(), &directory),
                    folder,
                )
            })
            .collect();
        let ids = self.downloads.enqueue_many(requests).await?;
        self.notifier
            .info(&format!("Queued {} files for download", ids.len()));
        Ok(Some(ids))
    }

    pub async fn global_search(&self, query: &str) -> Vec<FileEntry> {
        self.search.search_now(query).await
    }

    pub async fn bandwidth(&self) -> Result<BandwidthStats, BackendError> {
        self.backend.bandwidth().await
    }

    async fn download_all(&self, files: &[FileEntry], directory: PathBuf) -> BulkReport {
        let folder = self.active_folder();
        let mut report = BulkReport::default();
        for file in files {
            let target = directory.join(&file.name);
            let result = self.backend.download_file(file.id, &target, folder).await;
            if let Err(err) = &result {
                tracing::warn!(id = file.id, name = %file.name, error = %err, "download failed");
            }
            report.record(&result);
        }
        report
    }

    async fn current_selection(&self) -> tokio::sync::MutexGuard<'_, SelectionSet> {
        let mut selection = self.selection.lock().await;
        selection.retarget(self.active_folder());
        selection
    }
}
