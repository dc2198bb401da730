use std::sync::Arc;

use async_trait::async_trait;
use chatdrive_core::Backend;

use super::item::{TransferItem, TransferOutcome, TransferRequest};
use crate::listing::ListingCache;
use crate::prompt::{Notifier, Prompter};

/// Runs one started transfer to completion.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn execute(&self, item: &TransferItem) -> TransferOutcome;
}

pub struct UploadExecutor {
    backend: Arc<dyn Backend>,
    listings: Arc<ListingCache>,
    notifier: Arc<dyn Notifier>,
}

impl UploadExecutor {
    pub fn new(
        backend: Arc<dyn Backend>,
        listings: Arc<ListingCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            listings,
            notifier,
        }
    }
}

#[async_trait]
impl TransferExecutor for UploadExecutor {
    async fn execute(&self, item: &TransferItem) -> TransferOutcome {
        let TransferRequest::Upload { source_path } = &item.request else {
            return TransferOutcome::Failed("not an upload".to_string());
        };
        match self
            .backend
            .upload_file(source_path, item.target_folder)
            .await
        {
            Ok(()) => {
                self.listings.invalidate(item.target_folder).await;
                TransferOutcome::Success
            }
            Err(err) => {
                let message = err.to_string();
                self.notifier.error(&format!(
                    "Upload failed for {}: {message}",
                    item.request.label()
                ));
                TransferOutcome::Failed(message)
            }
        }
    }
}

pub struct DownloadExecutor {
    backend: Arc<dyn Backend>,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
}

impl DownloadExecutor {
    pub fn new(
        backend: Arc<dyn Backend>,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            prompter,
            notifier,
        }
    }
}

#[async_trait]
impl TransferExecutor for DownloadExecutor {
    async fn execute(&self, item: &TransferItem) -> TransferOutcome {
        let TransferRequest::Download {
            remote_item_id,
            display_name,
            destination,
        } = &item.request
        else {
            return TransferOutcome::Failed("not a download".to_string());
        };

        let save_path = match destination {
            Some(path) => path.clone(),
            None => match self.prompter.pick_save_path(display_name).await {
                Some(path) => path,
                None => {
                    tracing::debug!(id = %item.id, "save prompt dismissed");
                    return TransferOutcome::Declined;
                }
            },
        };

        match self
            .backend
            .download_file(*remote_item_id, &save_path, item.target_folder)
            .await
        {
            Ok(()) => {
                self.notifier.success(&format!("Downloaded: {display_name}"));
                TransferOutcome::Success
            }
            Err(err) => {
                self.notifier
                    .error(&format!("Download failed: {display_name}"));
                TransferOutcome::Failed(err.to_string())
            }
        }
    }
}
