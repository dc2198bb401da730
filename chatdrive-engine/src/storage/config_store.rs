use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value};
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.json";
const LEGACY_FILENAME: &str = "settings.json";
const CREDENTIAL_KEY: &str = "api_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid store contents: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store root must be a JSON object")]
    NotAnObject,
    #[error("store lock poisoned")]
    Poisoned,
}

/// Persisted key-value store holding the client's durable state.
///
/// `set` and `delete` only touch the in-memory view; nothing reaches disk
/// until `save` is called.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    /// Returns whether the key was present.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
    fn save(&self) -> Result<(), StoreError>;
}

/// A single JSON object file, rewritten whole on every save.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens `path`; a missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                _ => return Err(StoreError::NotAnObject),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Opens `config.json` under `dir`. Older installs kept credentials in
    /// `settings.json`; that file is used instead when only it holds them.
    pub fn open_default(dir: &Path) -> Result<Self, StoreError> {
        let primary = Self::open(dir.join(CONFIG_FILENAME))?;
        if primary.get(CREDENTIAL_KEY)?.is_some() {
            return Ok(primary);
        }
        let legacy_path = dir.join(LEGACY_FILENAME);
        if legacy_path.exists() {
            let legacy = Self::open(legacy_path)?;
            if legacy.get(CREDENTIAL_KEY)?.is_some() {
                tracing::info!(path = %legacy.path.display(), "using legacy settings store");
                return Ok(legacy);
            }
        }
        Ok(primary)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.remove(key).is_some())
    }

    fn save(&self) -> Result<(), StoreError> {
        let content = {
            let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
            serde_json::to_string_pretty(&*entries)?
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = partial_path(&self.path);
        fs::write(&partial, content)?;
        fs::rename(&partial, &self.path)?;
        Ok(())
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}

/// Volatile store for tests and headless runs without a profile directory.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Map<String, Value>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.remove(key).is_some())
    }

    fn save(&self) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("config.json")).unwrap();
        assert_eq!(store.get("api_id").unwrap(), None);
    }

    #[test]
    fn values_survive_save_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("api_id", json!("12345")).unwrap();
        store.set("folders", json!([{"id": 1, "name": "A"}])).unwrap();
        store.save().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("api_id").unwrap(), Some(json!("12345")));
        assert_eq!(
            reopened.get("folders").unwrap(),
            Some(json!([{"id": 1, "name": "A"}]))
        );
        assert!(!dir.path().join("nested/config.json.partial").exists());
    }

    #[test]
    fn unsaved_changes_are_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("view_mode", json!("list")).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("view_mode").unwrap(), None);
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryStore::with_entries([("api_id", json!("1"))]);
        assert!(store.delete("api_id").unwrap());
        assert!(!store.delete("api_id").unwrap());
    }

    #[test]
    fn non_object_root_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::NotAnObject)
        ));
    }

    #[test]
    fn open_default_falls_back_to_legacy_credentials() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"api_id": "777", "folders": []}"#,
        )
        .unwrap();

        let store = JsonFileStore::open_default(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path().join("settings.json"));
        assert_eq!(store.get("api_id").unwrap(), Some(json!("777")));
    }

    #[test]
    fn open_default_prefers_primary_with_credentials() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"api_id": "1"}"#).unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"api_id": "2"}"#).unwrap();

        let store = JsonFileStore::open_default(dir.path()).unwrap();
        assert_eq!(store.get("api_id").unwrap(), Some(json!("1")));
    }

    #[test]
    fn open_default_without_any_credentials_uses_primary() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open_default(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path().join("config.json"));
    }
}
