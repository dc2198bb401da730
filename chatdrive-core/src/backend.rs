use std::path::Path;

use async_trait::async_trait;

use crate::client::BackendError;
use crate::types::{BandwidthStats, FileEntry, Folder, FolderId};

/// Typed call surface over the backend command interface.
///
/// Every method maps to exactly one named command. Implementations must not
/// retry on their own; callers decide what a failure means.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establishes the session using the previously stored credential id.
    async fn connect(&self, api_id: i32) -> Result<(), BackendError>;

    async fn logout(&self) -> Result<(), BackendError>;

    /// Clears the backend's ephemeral cache.
    async fn clean_cache(&self) -> Result<(), BackendError>;

    /// Folders currently visible to the backend, including ones this client
    /// has never seen.
    async fn scan_folders(&self) -> Result<Vec<Folder>, BackendError>;

    async fn create_folder(&self, name: &str) -> Result<Folder, BackendError>;

    async fn delete_folder(&self, folder_id: i64) -> Result<(), BackendError>;

    async fn list_files(&self, folder_id: FolderId) -> Result<Vec<FileEntry>, BackendError>;

    async fn upload_file(&self, path: &Path, folder_id: FolderId) -> Result<(), BackendError>;

    async fn download_file(
        &self,
        remote_id: i64,
        save_path: &Path,
        folder_id: FolderId,
    ) -> Result<(), BackendError>;

    async fn delete_file(&self, remote_id: i64, folder_id: FolderId) -> Result<(), BackendError>;

    /// Relocates all ids in one call; the backend applies it atomically.
    async fn move_files(
        &self,
        remote_ids: &[i64],
        source_folder_id: FolderId,
        target_folder_id: FolderId,
    ) -> Result<(), BackendError>;

    async fn search_global(&self, query: &str) -> Result<Vec<FileEntry>, BackendError>;

    /// Lightweight reachability probe, independent of the command protocol.
    async fn is_network_available(&self) -> Result<bool, BackendError>;

    async fn bandwidth(&self) -> Result<BandwidthStats, BackendError>;
}
