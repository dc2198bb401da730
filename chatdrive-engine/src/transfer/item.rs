use std::fmt;
use std::path::{Path, PathBuf};

use chatdrive_core::FolderId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::storage::keys;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

/// Opaque queue-local token identifying one transfer item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InFlight,
    Success,
    Failed,
}

impl TransferStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl TransferDirection {
    pub fn store_key(self) -> &'static str {
        match self {
            TransferDirection::Upload => keys::UPLOAD_QUEUE,
            TransferDirection::Download => keys::DOWNLOAD_QUEUE,
        }
    }

    /// Failed downloads are cleared with successes; failed uploads stay
    /// until removed one by one.
    pub fn clears_failed(self) -> bool {
        matches!(self, TransferDirection::Download)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferDirection::Upload => "upload",
            TransferDirection::Download => "download",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRequest {
    Upload {
        source_path: PathBuf,
    },
    Download {
        remote_item_id: i64,
        display_name: String,
        /// Preset save path; when absent the user is asked at start time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PathBuf>,
    },
}

impl TransferRequest {
    pub fn upload(source_path: impl Into<PathBuf>) -> Self {
        TransferRequest::Upload {
            source_path: source_path.into(),
        }
    }

    pub fn download(remote_item_id: i64, display_name: impl Into<String>) -> Self {
        TransferRequest::Download {
            remote_item_id,
            display_name: display_name.into(),
            destination: None,
        }
    }

    pub fn download_into(
        remote_item_id: i64,
        display_name: impl Into<String>,
        directory: &Path,
    ) -> Self {
        let display_name = display_name.into();
        TransferRequest::Download {
            remote_item_id,
            destination: Some(directory.join(&display_name)),
            display_name,
        }
    }

    pub fn direction(&self) -> TransferDirection {
        match self {
            TransferRequest::Upload { .. } => TransferDirection::Upload,
            TransferRequest::Download { .. } => TransferDirection::Download,
        }
    }

    /// Short name used in notifications.
    pub fn label(&self) -> String {
        match self {
            TransferRequest::Upload { source_path } => source_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| source_path.display().to_string()),
            TransferRequest::Download { display_name, .. } => display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferItem {
    pub id: TransferId,
    #[serde(flatten)]
    pub request: TransferRequest,
    pub target_folder: FolderId,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub queued_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_seq: Option<u64>,
}

impl TransferItem {
    pub fn new(request: TransferRequest, target_folder: FolderId) -> Self {
        Self {
            id: TransferId::generate(),
            request,
            target_folder,
            status: TransferStatus::Pending,
            error: None,
            queued_at: OffsetDateTime::now_utc().unix_timestamp(),
            started_seq: None,
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.request.direction()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failed(String),
    /// The user declined a prompt; the item is dropped rather than failed.
    Declined,
}
