use std::sync::Arc;

use chatdrive_core::{Folder, FolderId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config_store::{ConfigStore, StoreError};

pub mod keys {
    pub const API_ID: &str = "api_id";
    pub const API_HASH: &str = "api_hash";
    pub const FOLDERS: &str = "folders";
    pub const UPLOAD_QUEUE: &str = "upload_queue";
    pub const DOWNLOAD_QUEUE: &str = "download_queue";
    pub const ACTIVE_FOLDER: &str = "active_folder_id";
    pub const VIEW_MODE: &str = "view_mode";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Typed access to the keys the client persists.
///
/// The `*_or_default` style accessors are best-effort: read and write
/// failures are logged and swallowed so a broken store never takes the
/// caller down with it.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn ConfigStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Sets `key` and flushes the store.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.store.set(key, serde_json::to_value(value)?)?;
        self.store.save()
    }

    /// Deletes every key and flushes once.
    pub fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.store.delete(key)?;
        }
        self.store.save()
    }

    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read persisted value");
                T::default()
            }
        }
    }

    pub fn write_best_effort<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(err) = self.write(key, value) {
            tracing::warn!(key, error = %err, "failed to persist value");
        }
    }

    /// The stored credential id. Older profiles stored it as a number.
    pub fn api_id(&self) -> Result<Option<String>, StoreError> {
        Ok(match self.store.get(keys::API_ID)? {
            Some(Value::String(value)) if !value.trim().is_empty() => Some(value),
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        })
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.read_or_default(keys::FOLDERS)
    }

    pub fn set_folders(&self, folders: &[Folder]) {
        self.write_best_effort(keys::FOLDERS, folders);
    }

    pub fn active_folder(&self) -> FolderId {
        self.read_or_default::<Option<i64>>(keys::ACTIVE_FOLDER)
    }

    pub fn set_active_folder(&self, folder: FolderId) {
        self.write_best_effort(keys::ACTIVE_FOLDER, &folder);
    }

    pub fn view_mode(&self) -> ViewMode {
        self.read_or_default(keys::VIEW_MODE)
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.write_best_effort(keys::VIEW_MODE, &mode);
    }
}
