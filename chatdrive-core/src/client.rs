use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use crate::backend::Backend;
use crate::types::{BandwidthStats, FileEntry, Folder, FolderId};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8730";
pub const DEFAULT_PROBE_ADDR: &str = "149.154.167.50:443";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("backend returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("{message}")]
    Command {
        code: Option<String>,
        message: String,
    },
    #[error("malformed reply for {command}: {reason}")]
    Decode { command: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Auth,
    RateLimit,
    Unreachable,
    Failed,
}

impl BackendError {
    pub fn not_found(message: impl Into<String>) -> Self {
        BackendError::Command {
            code: Some("not_found".to_string()),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Command {
            code: None,
            message: message.into(),
        }
    }

    pub fn classification(&self) -> ErrorClass {
        match self {
            BackendError::Request(err) if err.is_connect() || err.is_timeout() => {
                ErrorClass::Unreachable
            }
            BackendError::Request(_) | BackendError::Url(_) | BackendError::Decode { .. } => {
                ErrorClass::Failed
            }
            BackendError::Api { status, .. } => classify_api_status(*status),
            BackendError::Command { code, message } => code
                .as_deref()
                .and_then(classify_code)
                .unwrap_or_else(|| classify_message(message)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.classification() == ErrorClass::NotFound
    }
}

fn classify_api_status(status: StatusCode) -> ErrorClass {
    if status == StatusCode::NOT_FOUND {
        ErrorClass::NotFound
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ErrorClass::RateLimit
    } else if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        ErrorClass::Unreachable
    } else {
        ErrorClass::Failed
    }
}

fn classify_code(code: &str) -> Option<ErrorClass> {
    match code {
        "not_found" => Some(ErrorClass::NotFound),
        "unauthorized" | "auth_required" => Some(ErrorClass::Auth),
        "rate_limited" | "flood_wait" => Some(ErrorClass::RateLimit),
        "unreachable" => Some(ErrorClass::Unreachable),
        _ => None,
    }
}

// Replies without a code fall back to the message text: anything mentioning
// "not found" is treated as a missing resource.
fn classify_message(message: &str) -> ErrorClass {
    if message.to_ascii_lowercase().contains("not found") {
        ErrorClass::NotFound
    } else {
        ErrorClass::Failed
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CommandReply<T> {
    Ok { data: Option<T> },
    Error { error: CommandFailure },
}

#[derive(Debug, Deserialize)]
struct CommandFailure {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Clone)]
pub struct CommandClient {
    http: Client,
    base_url: Url,
    probe_addr: String,
    probe_timeout: Duration,
}

impl CommandClient {
    pub fn new() -> Result<Self, BackendError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    pub fn with_probe(mut self, addr: impl Into<String>, timeout: Duration) -> Self {
        self.probe_addr = addr.into();
        self.probe_timeout = timeout;
        self
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(command)?;
        let response = self.http.post(url).json(&args).send().await?;
        let reply: CommandReply<T> = Self::handle_response(response).await?;
        match reply {
            CommandReply::Ok { data: Some(data) } => Ok(data),
            // Unit-returning commands may reply with a null or missing payload.
            CommandReply::Ok { data: None } => {
                serde_json::from_value(Value::Null).map_err(|err| BackendError::Decode {
                    command: command.to_string(),
                    reason: err.to_string(),
                })
            }
            CommandReply::Error { error } => Err(BackendError::Command {
                code: error.code,
                message: error.message,
            }),
        }
    }

    fn endpoint(&self, command: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(&format!("/v1/commands/{command}"))?)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::Api { status, body })
        }
    }
}

#[async_trait]
impl Backend for CommandClient {
    async fn connect(&self, api_id: i32) -> Result<(), BackendError> {
        self.invoke("connect", json!({ "apiId": api_id })).await
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.invoke("logout", json!({})).await
    }

    async fn clean_cache(&self) -> Result<(), BackendError> {
        self.invoke("clean_cache", json!({})).await
    }

    async fn scan_folders(&self) -> Result<Vec<Folder>, BackendError> {
        self.invoke("scan_folders", json!({})).await
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, BackendError> {
        self.invoke("create_folder", json!({ "name": name })).await
    }

    async fn delete_folder(&self, folder_id: i64) -> Result<(), BackendError> {
        self.invoke("delete_folder", json!({ "folderId": folder_id }))
            .await
    }

    async fn list_files(&self, folder_id: FolderId) -> Result<Vec<FileEntry>, BackendError> {
        self.invoke("get_files", json!({ "folderId": folder_id }))
            .await
    }

    async fn upload_file(&self, path: &Path, folder_id: FolderId) -> Result<(), BackendError> {
        self.invoke(
            "upload_file",
            json!({ "path": path.to_string_lossy(), "folderId": folder_id }),
        )
        .await
    }

    async fn download_file(
        &self,
        remote_id: i64,
        save_path: &Path,
        folder_id: FolderId,
    ) -> Result<(), BackendError> {
        self.invoke(
            "download_file",
            json!({
                "messageId": remote_id,
                "savePath": save_path.to_string_lossy(),
                "folderId": folder_id,
            }),
        )
        .await
    }

    async fn delete_file(&self, remote_id: i64, folder_id: FolderId) -> Result<(), BackendError> {
        self.invoke(
            "delete_file",
            json!({ "messageId": remote_id, "folderId": folder_id }),
        )
        .await
    }

    async fn move_files(
        &self,
        remote_ids: &[i64],
        source_folder_id: FolderId,
        target_folder_id: FolderId,
    ) -> Result<(), BackendError> {
        self.invoke(
            "move_files",
            json!({
                "messageIds": remote_ids,
                "sourceFolderId": source_folder_id,
                "targetFolderId": target_folder_id,
            }),
        )
        .await
    }

    async fn search_global(&self, query: &str) -> Result<Vec<FileEntry>, BackendError> {
        self.invoke("search_global", json!({ "query": query }))
            .await
    }

    async fn is_network_available(&self) -> Result<bool, BackendError> {
        let probe = tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await;
        Ok(matches!(probe, Ok(Ok(_))))
    }

    async fn bandwidth(&self) -> Result<BandwidthStats, BackendError> {
        self.invoke("get_bandwidth", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_code_wins_over_message() {
        let err = BackendError::Command {
            code: Some("unauthorized".into()),
            message: "session not found".into(),
        };
        assert_eq!(err.classification(), ErrorClass::Auth);
    }

    #[test]
    fn message_fallback_detects_not_found() {
        let err = BackendError::failed("Folder/Chat 42 Not Found");
        assert!(err.is_not_found());
        let err = BackendError::failed("flood wait of 30 seconds");
        assert_eq!(err.classification(), ErrorClass::Failed);
    }

    #[test]
    fn unknown_code_falls_back_to_message() {
        let err = BackendError::Command {
            code: Some("channel_invalid".into()),
            message: "channel not found".into(),
        };
        assert_eq!(err.classification(), ErrorClass::NotFound);
    }

    #[test]
    fn api_statuses_are_classified() {
        let class = |status| {
            BackendError::Api {
                status,
                body: String::new(),
            }
            .classification()
        };
        assert_eq!(class(StatusCode::NOT_FOUND), ErrorClass::NotFound);
        assert_eq!(class(StatusCode::UNAUTHORIZED), ErrorClass::Auth);
        assert_eq!(class(StatusCode::TOO_MANY_REQUESTS), ErrorClass::RateLimit);
        assert_eq!(class(StatusCode::BAD_GATEWAY), ErrorClass::Unreachable);
        assert_eq!(class(StatusCode::BAD_REQUEST), ErrorClass::Failed);
    }
}
