#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatdrive_core::{Backend, BackendError, BandwidthStats, FileEntry, Folder, FolderId};
use chatdrive_engine::prompt::{
    ConfirmRequest, ConnectDecision, NoticeLevel, Notifier, Prompter,
};

#[derive(Debug, Clone)]
pub enum Fail {
    NotFound,
    Other(String),
}

impl Fail {
    fn to_error(&self, op: &str) -> BackendError {
        match self {
            Fail::NotFound => BackendError::not_found(format!("{op}: not found")),
            Fail::Other(message) => BackendError::failed(message.clone()),
        }
    }
}

/// Scriptable in-memory backend that records every call.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<(String, Option<i64>), Fail>>,
    connect_failures: AtomicUsize,
    scanned: Mutex<Vec<Folder>>,
    files: Mutex<HashMap<FolderId, Vec<FileEntry>>>,
    search_results: Mutex<Vec<FileEntry>>,
    next_folder_id: AtomicUsize,
    transfer_delay: Mutex<Option<Duration>>,
    listing_delay: Mutex<Option<Duration>>,
    active_transfers: AtomicUsize,
    max_active_transfers: AtomicUsize,
    online: Mutex<Option<bool>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            next_folder_id: AtomicUsize::new(100),
            online: Mutex::new(Some(true)),
            ..Self::default()
        }
    }

    /// Fails `op` for `arg`, or for every call when `arg` is `None`.
    pub fn fail(&self, op: &str, arg: Option<i64>, fail: Fail) {
        self.failures
            .lock()
            .unwrap()
            .insert((op.to_string(), arg), fail);
    }

    pub fn fail_connects(&self, times: usize) {
        self.connect_failures.store(times, Ordering::SeqCst);
    }

    pub fn set_scanned(&self, folders: Vec<Folder>) {
        *self.scanned.lock().unwrap() = folders;
    }

    pub fn set_files(&self, folder: FolderId, files: Vec<FileEntry>) {
        self.files.lock().unwrap().insert(folder, files);
    }

    pub fn set_search_results(&self, files: Vec<FileEntry>) {
        *self.search_results.lock().unwrap() = files;
    }

    pub fn set_transfer_delay(&self, delay: Duration) {
        *self.transfer_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_listing_delay(&self, delay: Duration) {
        *self.listing_delay.lock().unwrap() = Some(delay);
    }

    /// `None` makes the probe itself error.
    pub fn set_online(&self, online: Option<bool>) {
        *self.online.lock().unwrap() = online;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call == op || call.starts_with(&format!("{op} ")))
            .collect()
    }

    pub fn max_active_transfers(&self) -> usize {
        self.max_active_transfers.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &str, arg: Option<i64>) -> Result<(), BackendError> {
        let failures = self.failures.lock().unwrap();
        let scripted = arg
            .and_then(|arg| failures.get(&(op.to_string(), Some(arg))))
            .or_else(|| failures.get(&(op.to_string(), None)));
        match scripted {
            Some(fail) => Err(fail.to_error(op)),
            None => Ok(()),
        }
    }

    async fn transfer(&self) {
        let active = self.active_transfers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_transfers.fetch_max(active, Ordering::SeqCst);
        let delay = *self.transfer_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active_transfers.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn connect(&self, api_id: i32) -> Result<(), BackendError> {
        self.record(format!("connect {api_id}"));
        let remaining = self.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::failed("connection refused"));
        }
        self.check("connect", None)
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.record("logout".to_string());
        self.check("logout", None)
    }

    async fn clean_cache(&self) -> Result<(), BackendError> {
        self.record("clean_cache".to_string());
        self.check("clean_cache", None)
    }

    async fn scan_folders(&self) -> Result<Vec<Folder>, BackendError> {
        self.record("scan_folders".to_string());
        self.check("scan_folders", None)?;
        Ok(self.scanned.lock().unwrap().clone())
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, BackendError> {
        self.record(format!("create_folder {name}"));
        self.check("create_folder", None)?;
        let id = self.next_folder_id.fetch_add(1, Ordering::SeqCst) as i64;
        Ok(folder(id, name))
    }

    async fn delete_folder(&self, folder_id: i64) -> Result<(), BackendError> {
        self.record(format!("delete_folder {folder_id}"));
        self.check("delete_folder", Some(folder_id))
    }

    async fn list_files(&self, folder_id: FolderId) -> Result<Vec<FileEntry>, BackendError> {
        self.record(format!("list_files {folder_id:?}"));
        let delay = *self.listing_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check("list_files", folder_id)?;
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&folder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_file(&self, path: &Path, folder_id: FolderId) -> Result<(), BackendError> {
        self.record(format!("upload_file {} {folder_id:?}", path.display()));
        self.transfer().await;
        self.check("upload_file", None)
    }

    async fn download_file(
        &self,
        remote_id: i64,
        save_path: &Path,
        folder_id: FolderId,
    ) -> Result<(), BackendError> {
        self.record(format!(
            "download_file {remote_id} {} {folder_id:?}",
            save_path.display()
        ));
        self.transfer().await;
        self.check("download_file", Some(remote_id))
    }

    async fn delete_file(&self, remote_id: i64, folder_id: FolderId) -> Result<(), BackendError> {
        self.record(format!("delete_file {remote_id} {folder_id:?}"));
        self.check("delete_file", Some(remote_id))
    }

    async fn move_files(
        &self,
        remote_ids: &[i64],
        source_folder_id: FolderId,
        target_folder_id: FolderId,
    ) -> Result<(), BackendError> {
        self.record(format!(
            "move_files {remote_ids:?} {source_folder_id:?} {target_folder_id:?}"
        ));
        self.check("move_files", None)
    }

    async fn search_global(&self, query: &str) -> Result<Vec<FileEntry>, BackendError> {
        self.record(format!("search_global {query}"));
        self.check("search_global", None)?;
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn is_network_available(&self) -> Result<bool, BackendError> {
        self.record("is_network_available".to_string());
        match *self.online.lock().unwrap() {
            Some(online) => Ok(online),
            None => Err(BackendError::failed("probe crashed")),
        }
    }

    async fn bandwidth(&self) -> Result<BandwidthStats, BackendError> {
        self.record("bandwidth".to_string());
        self.check("bandwidth", None)?;
        Ok(BandwidthStats {
            date: "2024-05-01".to_string(),
            up_bytes: 10,
            down_bytes: 20,
        })
    }
}

/// Prompter answering from queues of scripted replies.
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    default_confirm: bool,
    save_paths: Mutex<VecDeque<Option<PathBuf>>>,
    directory: Mutex<Option<PathBuf>>,
    connect_decisions: Mutex<VecDeque<ConnectDecision>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(default_confirm: bool) -> Self {
        Self {
            confirms: Mutex::new(VecDeque::new()),
            default_confirm,
            save_paths: Mutex::new(VecDeque::new()),
            directory: Mutex::new(Some(PathBuf::from("/downloads"))),
            connect_decisions: Mutex::new(VecDeque::new()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn push_confirm(&self, answer: bool) {
        self.confirms.lock().unwrap().push_back(answer);
    }

    pub fn push_save_path(&self, path: Option<&str>) {
        self.save_paths
            .lock()
            .unwrap()
            .push_back(path.map(PathBuf::from));
    }

    pub fn set_directory(&self, directory: Option<&str>) {
        *self.directory.lock().unwrap() = directory.map(PathBuf::from);
    }

    pub fn push_connect_decision(&self, decision: ConnectDecision) {
        self.connect_decisions.lock().unwrap().push_back(decision);
    }

    /// Titles of confirmations and picker names, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        self.asked.lock().unwrap().push(request.title.clone());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_confirm)
    }

    async fn pick_save_path(&self, default_name: &str) -> Option<PathBuf> {
        self.asked
            .lock()
            .unwrap()
            .push(format!("save {default_name}"));
        self.save_paths
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(PathBuf::from("/downloads").join(default_name)))
    }

    async fn pick_directory(&self, title: &str) -> Option<PathBuf> {
        self.asked.lock().unwrap().push(title.to_string());
        self.directory.lock().unwrap().clone()
    }

    async fn connect_failed(&self, error: &str) -> ConnectDecision {
        self.asked
            .lock()
            .unwrap()
            .push(format!("connect failed: {error}"));
        self.connect_decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectDecision::Abandon)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(level, _)| *level == NoticeLevel::Error)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

pub fn folder(id: i64, name: &str) -> Folder {
    Folder {
        id,
        name: name.to_string(),
        parent_id: None,
    }
}

pub fn file(id: i64, name: &str) -> FileEntry {
    FileEntry {
        id,
        folder_id: None,
        name: name.to_string(),
        size: 1,
        mime_type: None,
        file_ext: None,
        created_at: String::new(),
        icon_type: "document".to_string(),
    }
}
