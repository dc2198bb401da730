use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmVariant {
    Danger,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub variant: ConfirmVariant,
}

impl ConfirmRequest {
    pub fn danger(
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_text: confirm_text.into(),
            variant: ConfirmVariant::Danger,
        }
    }

    pub fn info(
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_text: impl Into<String>,
    ) -> Self {
        Self {
            variant: ConfirmVariant::Info,
            ..Self::danger(title, message, confirm_text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    Retry,
    Abandon,
}

/// Blocking user decisions: confirmations and native pickers.
///
/// `None` from a picker means the user dismissed it.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, request: ConfirmRequest) -> bool;
    async fn pick_save_path(&self, default_name: &str) -> Option<PathBuf>;
    async fn pick_directory(&self, title: &str) -> Option<PathBuf>;
    async fn connect_failed(&self, error: &str) -> ConnectDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Non-blocking user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// Routes notifications into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!(?level, "{message}"),
            NoticeLevel::Error => tracing::warn!(?level, "{message}"),
        }
    }
}

/// Answers prompts without a user, for the headless binary.
///
/// Files land in `download_dir`; confirmations follow `assume_yes`; a failed
/// connect is retried `connect_retries` times before giving up.
pub struct AutoPrompter {
    download_dir: PathBuf,
    assume_yes: bool,
    connect_retries: AtomicU32,
}

impl AutoPrompter {
    pub fn new(download_dir: PathBuf, assume_yes: bool, connect_retries: u32) -> Self {
        Self {
            download_dir,
            assume_yes,
            connect_retries: AtomicU32::new(connect_retries),
        }
    }
}

#[async_trait]
impl Prompter for AutoPrompter {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        tracing::info!(
            title = %request.title,
            answer = self.assume_yes,
            "auto-answering confirmation"
        );
        self.assume_yes
    }

    async fn pick_save_path(&self, default_name: &str) -> Option<PathBuf> {
        Some(self.download_dir.join(default_name))
    }

    async fn pick_directory(&self, _title: &str) -> Option<PathBuf> {
        Some(self.download_dir.clone())
    }

    async fn connect_failed(&self, error: &str) -> ConnectDecision {
        let remaining = self
            .connect_retries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match remaining {
            Ok(left) => {
                tracing::warn!(error, retries_left = left - 1, "connect failed, retrying");
                ConnectDecision::Retry
            }
            Err(_) => ConnectDecision::Abandon,
        }
    }
}
