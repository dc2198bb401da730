use std::sync::Arc;

use chatdrive_core::{Backend, BackendError, ErrorClass, Folder, FolderId};
use thiserror::Error;
use tokio::sync::watch;

use super::folders::{merge_folders, without_folder};
use super::state::{SessionEvent, SessionPhase, SessionState};
use crate::listing::ListingCache;
use crate::prompt::{ConfirmRequest, ConnectDecision, Notifier, Prompter};
use crate::storage::{Settings, keys};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("folder name must not be empty")]
    EmptyFolderName,
}

/// How a failed backend call should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAttribution {
    /// The last probe said the network is down.
    Offline,
    Backend(ErrorClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderDeletion {
    Cancelled,
    Deleted,
    /// The backend no longer knew the folder and the user dropped the local
    /// entry.
    RemovedStale,
    /// The backend no longer knew the folder and the user kept it.
    Kept,
}

pub struct SessionManager {
    backend: Arc<dyn Backend>,
    settings: Settings,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
    listings: Arc<ListingCache>,
    state: watch::Sender<SessionState>,
    folders: watch::Sender<Arc<Vec<Folder>>>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn Backend>,
        settings: Settings,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
        listings: Arc<ListingCache>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (folders, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            backend,
            settings,
            prompter,
            notifier,
            listings,
            state,
            folders,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn active_folder(&self) -> FolderId {
        self.state.borrow().active_folder
    }

    pub fn subscribe_folders(&self) -> watch::Receiver<Arc<Vec<Folder>>> {
        self.folders.subscribe()
    }

    pub fn folders(&self) -> Arc<Vec<Folder>> {
        self.folders.borrow().clone()
    }

    /// Runs startup until the session is Connected or LoggedOut.
    ///
    /// A failed connect asks the user; `Retry` starts over from reading the
    /// store, `Abandon` forgets the stored credential id.
    pub async fn start(&self) -> SessionPhase {
        loop {
            self.state.send_modify(|state| {
                state.phase = SessionPhase::Uninitialized;
            });

            let api_id = match self.settings.api_id() {
                Ok(Some(api_id)) => api_id,
                Ok(None) => {
                    tracing::info!("no stored credentials");
                    return self.fail_startup();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read credentials");
                    return self.fail_startup();
                }
            };
            let Ok(api_id) = api_id.trim().parse::<i32>() else {
                tracing::warn!("stored api id is not numeric");
                return self.fail_startup();
            };

            self.folders.send_replace(Arc::new(self.settings.folders()));
            let active = self.settings.active_folder();
            self.apply(SessionEvent::CredentialsLoaded, |state| {
                state.credentials_present = true;
                state.active_folder = active;
            });

            tracing::info!(api_id, "connecting");
            match self.backend.connect(api_id).await {
                Ok(()) => {
                    self.apply(SessionEvent::ConnectSucceeded, |state| {
                        state.connected = true;
                    });
                    self.listings.invalidate_all().await;
                    return SessionPhase::Connected;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "connect failed");
                    match self.prompter.connect_failed(&err.to_string()).await {
                        ConnectDecision::Retry => {
                            self.apply(SessionEvent::Retry, |_| {});
                        }
                        ConnectDecision::Abandon => {
                            if let Err(err) = self.settings.remove(&[keys::API_ID]) {
                                tracing::warn!(error = %err, "failed to forget credentials");
                            }
                            self.apply(SessionEvent::Abandoned, |state| {
                                state.credentials_present = false;
                            });
                            return SessionPhase::LoggedOut;
                        }
                    }
                }
            }
        }
    }

    /// Asks for confirmation, then signs out. Returns `false` when the user
    /// backed out.
    pub async fn logout(&self) -> bool {
        let confirmed = self
            .prompter
            .confirm(ConfirmRequest::danger(
                "Sign Out",
                "Are you sure you want to sign out? This will disconnect your active session.",
                "Sign Out",
            ))
            .await;
        if !confirmed {
            return false;
        }
        self.force_logout().await;
        true
    }

    /// Tears the session down. Backend and store failures are reported but
    /// the session always ends LoggedOut.
    pub async fn force_logout(&self) {
        let mut failure = None;
        if let Err(err) = self.backend.logout().await {
            tracing::warn!(error = %err, "backend logout failed");
            failure = Some(err.to_string());
        }
        if let Err(err) = self.backend.clean_cache().await {
            tracing::warn!(error = %err, "backend cache clean failed");
            failure.get_or_insert_with(|| err.to_string());
        }
        if let Err(err) = self
            .settings
            .remove(&[keys::API_ID, keys::API_HASH, keys::FOLDERS, keys::ACTIVE_FOLDER])
        {
            tracing::warn!(error = %err, "failed to clear local session state");
        }
        if let Some(message) = failure {
            self.notifier
                .error(&format!("Error signing out: {message}"));
        }

        self.folders.send_replace(Arc::new(Vec::new()));
        self.apply(SessionEvent::Logout, |state| {
            state.credentials_present = false;
            state.connected = false;
            state.active_folder = None;
            state.syncing = false;
        });
        tracing::info!("signed out");
    }

    /// Adds folders the backend reports that are not cached yet. Known
    /// folders are never removed. Returns the number added.
    pub async fn sync_folders(&self) -> Result<usize, SessionError> {
        self.state.send_modify(|state| state.syncing = true);
        let result = self.backend.scan_folders().await;
        self.state.send_modify(|state| state.syncing = false);

        let remote = match result {
            Ok(remote) => remote,
            Err(err) => {
                self.notifier.error(&format!("Sync failed: {err}"));
                return Err(err.into());
            }
        };

        let mut added = 0;
        self.folders.send_if_modified(|current| {
            let (merged, count) = merge_folders(current.as_slice(), &remote);
            added = count;
            if count > 0 {
                *current = Arc::new(merged);
            }
            count > 0
        });

        if added > 0 {
            self.settings.set_folders(&self.folders());
            self.notifier
                .success(&format!("Scan complete. Found {added} new folders."));
        } else {
            self.notifier.info("Scan complete. No new folders found.");
        }
        tracing::info!(added, "folder sync finished");
        Ok(added)
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyFolderName);
        }
        let folder = match self.backend.create_folder(name).await {
            Ok(folder) => folder,
            Err(err) => {
                self.notifier
                    .error(&format!("Failed to create folder: {err}"));
                return Err(err.into());
            }
        };

        self.folders.send_modify(|current| {
            let mut updated = current.to_vec();
            updated.push(folder.clone());
            *current = Arc::new(updated);
        });
        self.settings.set_folders(&self.folders());
        self.notifier
            .success(&format!("Folder \"{name}\" created."));
        Ok(folder)
    }

    /// Deletes a folder remotely and from the cache. When the backend no
    /// longer knows the folder the user may drop the stale local entry.
    pub async fn delete_folder(&self, id: i64, name: &str) -> Result<FolderDeletion, SessionError> {
        let confirmed = self
            .prompter
            .confirm(ConfirmRequest::danger(
                "Delete Folder",
                format!(
                    "Are you sure you want to delete \"{name}\"?\nThis will delete the channel on the backend."
                ),
                "Delete",
            ))
            .await;
        if !confirmed {
            return Ok(FolderDeletion::Cancelled);
        }

        match self.backend.delete_folder(id).await {
            Ok(()) => {
                self.forget_folder(id);
                self.notifier
                    .success(&format!("Folder \"{name}\" deleted."));
                Ok(FolderDeletion::Deleted)
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(id, "folder missing on backend");
                let remove = self
                    .prompter
                    .confirm(ConfirmRequest::info(
                        "Folder Not Found",
                        format!(
                            "Folder \"{name}\" was not found on the backend (it may have been deleted externally).\nRemove from this app?"
                        ),
                        "Remove",
                    ))
                    .await;
                if remove {
                    self.forget_folder(id);
                    Ok(FolderDeletion::RemovedStale)
                } else {
                    Ok(FolderDeletion::Kept)
                }
            }
            Err(err) => {
                self.notifier
                    .error(&format!("Failed to delete folder: {err}"));
                Err(err.into())
            }
        }
    }

    pub fn set_active_folder(&self, folder: FolderId) {
        let changed = self.state.send_if_modified(|state| {
            let changed = state.active_folder != folder;
            state.active_folder = folder;
            changed
        });
        if changed {
            self.settings.set_active_folder(folder);
        }
    }

    /// Updates the advisory connectivity flag; returns whether it flipped.
    pub fn set_connected(&self, connected: bool) -> bool {
        let flipped = self.state.send_if_modified(|state| {
            let flipped = state.connected != connected;
            state.connected = connected;
            flipped
        });
        if flipped {
            tracing::info!(connected, "connectivity changed");
        }
        flipped
    }

    /// Classifies a failed call. While the probe reports offline every
    /// failure is put down to the network.
    pub fn attribute_failure(&self, err: &BackendError) -> FailureAttribution {
        if !self.state.borrow().connected {
            return FailureAttribution::Offline;
        }
        FailureAttribution::Backend(err.classification())
    }

    fn forget_folder(&self, id: i64) {
        self.folders.send_modify(|current| {
            *current = Arc::new(without_folder(current.as_slice(), id));
        });
        self.settings.set_folders(&self.folders());
        if self.active_folder() == Some(id) {
            self.set_active_folder(None);
        }
    }

    fn fail_startup(&self) -> SessionPhase {
        self.apply(SessionEvent::CredentialsMissing, |state| {
            state.credentials_present = false;
        });
        SessionPhase::LoggedOut
    }

    fn apply(&self, event: SessionEvent, update: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(|state| {
            match state.phase.transition(event) {
                Some(next) => {
                    tracing::debug!(from = ?state.phase, to = ?next, ?event, "session transition");
                    state.phase = next;
                }
                None => {
                    tracing::warn!(phase = ?state.phase, ?event, "ignored session event");
                }
            }
            update(state);
        });
    }
}
