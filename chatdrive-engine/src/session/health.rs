use std::sync::Arc;
use std::time::Duration;

use chatdrive_core::Backend;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::SessionManager;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Periodic reachability probe feeding the advisory `connected` flag.
pub struct NetworkMonitor {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
    interval: Duration,
}

impl NetworkMonitor {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>, interval: Duration) -> Self {
        Self {
            backend,
            session,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// One probe. A probe that errors counts as offline.
    pub async fn check_once(&self) -> bool {
        let online = match self.backend.is_network_available().await {
            Ok(online) => online,
            Err(err) => {
                tracing::debug!(error = %err, "network probe failed");
                false
            }
        };
        self.session.set_connected(online);
        online
    }

    /// Probes immediately, then every interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
    }
}
