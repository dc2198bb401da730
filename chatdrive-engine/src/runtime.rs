use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chatdrive_core::{Backend, CommandClient};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::listing::ListingCache;
use crate::operations::{FacadeParts, OperationFacade};
use crate::prompt::{AutoPrompter, LogNotifier, Notifier, Prompter};
use crate::search::{SearchConfig, SearchCoordinator};
use crate::session::{NetworkMonitor, SessionManager, SessionPhase};
use crate::storage::{ConfigStore, JsonFileStore, Settings};
use crate::transfer::{DownloadExecutor, TransferDirection, TransferEngine, UploadExecutor};

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8730";
const DEFAULT_HEALTH_POLL_SECS: u64 = 10;
const DEFAULT_CONNECT_RETRIES: u64 = 3;
const APP_DIR_NAME: &str = "chatdrive";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub config_dir: PathBuf,
    pub download_dir: PathBuf,
    pub health_poll_interval: Duration,
    pub probe_addr: Option<String>,
    pub assume_yes: bool,
    pub connect_retries: u32,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        let config_dir = std::env::var("CHATDRIVE_CONFIG_DIR")
            .ok()
            .map(|value| expand_with_home(&value, &home))
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)))
            .context("configuration directory is unavailable")?;
        let download_dir = std::env::var("CHATDRIVE_DOWNLOAD_DIR")
            .ok()
            .map(|value| expand_with_home(&value, &home))
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| home.join("Downloads"));
        let backend_url = std::env::var("CHATDRIVE_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        let health_poll_interval = Duration::from_secs(read_u64_env(
            "CHATDRIVE_HEALTH_POLL_SECS",
            DEFAULT_HEALTH_POLL_SECS,
        ));
        let probe_addr = std::env::var("CHATDRIVE_PROBE_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let assume_yes = read_bool_env("CHATDRIVE_ASSUME_YES", false);
        let connect_retries =
            u32::try_from(read_u64_env("CHATDRIVE_CONNECT_RETRIES", DEFAULT_CONNECT_RETRIES))
                .unwrap_or(u32::MAX);

        Ok(Self {
            backend_url,
            config_dir,
            download_dir,
            health_poll_interval,
            probe_addr,
            assume_yes,
            connect_retries,
        })
    }
}

/// Every engine of one client process, wired together.
pub struct ClientRuntime {
    config: ClientConfig,
    session: Arc<SessionManager>,
    uploads: Arc<TransferEngine>,
    downloads: Arc<TransferEngine>,
    monitor: Arc<NetworkMonitor>,
    facade: Arc<OperationFacade>,
}

impl ClientRuntime {
    pub async fn bootstrap(config: ClientConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.config_dir)
            .await
            .with_context(|| format!("failed to create config dir at {:?}", config.config_dir))?;
        let store = JsonFileStore::open_default(&config.config_dir)
            .context("failed to open settings store")?;
        tracing::info!(path = %store.path().display(), "settings store opened");

        let mut client =
            CommandClient::with_base_url(&config.backend_url).context("invalid backend url")?;
        if let Some(addr) = &config.probe_addr {
            client = client.with_probe(addr.clone(), Duration::from_secs(2));
        }
        let prompter = Arc::new(AutoPrompter::new(
            config.download_dir.clone(),
            config.assume_yes,
            config.connect_retries,
        ));

        Ok(Self::assemble(
            config,
            Arc::new(client),
            Arc::new(store),
            prompter,
            Arc::new(LogNotifier),
        ))
    }

    pub fn assemble(
        config: ClientConfig,
        backend: Arc<dyn Backend>,
        store: Arc<dyn ConfigStore>,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let settings = Settings::new(store);
        let listings = Arc::new(ListingCache::new());
        let session = Arc::new(SessionManager::new(
            backend.clone(),
            settings.clone(),
            prompter.clone(),
            notifier.clone(),
            listings.clone(),
        ));
        let uploads = Arc::new(TransferEngine::new(
            TransferDirection::Upload,
            settings.clone(),
            Arc::new(UploadExecutor::new(
                backend.clone(),
                listings.clone(),
                notifier.clone(),
            )),
        ));
        let downloads = Arc::new(TransferEngine::new(
            TransferDirection::Download,
            settings,
            Arc::new(DownloadExecutor::new(
                backend.clone(),
                prompter.clone(),
                notifier.clone(),
            )),
        ));
        let monitor = Arc::new(NetworkMonitor::new(
            backend.clone(),
            session.clone(),
            config.health_poll_interval,
        ));
        let search = Arc::new(SearchCoordinator::new(
            backend.clone(),
            SearchConfig::default(),
        ));
        let facade = Arc::new(OperationFacade::new(FacadeParts {
            backend,
            session: session.clone(),
            listings,
            prompter,
            notifier,
            uploads: uploads.clone(),
            downloads: downloads.clone(),
            search,
        }));

        Self {
            config,
            session,
            uploads,
            downloads,
            monitor,
            facade,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn facade(&self) -> &Arc<OperationFacade> {
        &self.facade
    }

    /// Connects, then runs both transfer workers and the network monitor
    /// until ctrl-c.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            backend = %self.config.backend_url,
            config_dir = %self.config.config_dir.display(),
            "starting"
        );
        if self.session.start().await == SessionPhase::LoggedOut {
            tracing::warn!("not signed in; store credentials and start again");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        for engine in [self.uploads.clone(), self.downloads.clone()] {
            let cancel = cancel.child_token();
            tracker.spawn(async move { engine.run(cancel).await });
        }
        let monitor = self.monitor.clone();
        let monitor_cancel = cancel.child_token();
        tracker.spawn(async move { monitor.run(monitor_cancel).await });
        tracker.close();

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutting down; waiting for in-flight transfers");
        cancel.cancel();
        tracker.wait().await;
        Ok(())
    }

    /// Connects and merges backend folders into the cache.
    pub async fn sync_folders(&self) -> anyhow::Result<usize> {
        if self.session.start().await != SessionPhase::Connected {
            anyhow::bail!("not signed in");
        }
        self.session
            .sync_folders()
            .await
            .context("folder sync failed")
    }

    /// Drops the session without asking.
    pub async fn logout(&self) {
        self.session.force_logout().await;
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(stripped) = value.strip_prefix("~/") {
        return home.join(stripped);
    }
    PathBuf::from(value)
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
