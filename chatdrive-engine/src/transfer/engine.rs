use std::sync::Arc;

use chatdrive_core::FolderId;
use tokio::sync::{Mutex, Notify, watch};
use tokio_util::sync::CancellationToken;

use super::executor::TransferExecutor;
use super::item::{TransferDirection, TransferId, TransferItem, TransferRequest};
use super::queue::{QueueError, TransferQueue};
use crate::storage::Settings;

pub type QueueSnapshot = Arc<Vec<TransferItem>>;

/// Sequential transfer worker for one direction.
///
/// Every mutation republishes the queue on the snapshot channel and writes
/// the Pending subset to the store. In-flight and finished items are never
/// written, so they are gone after a restart. Store writes run on the
/// blocking pool while the queue lock is held, so they land in mutation
/// order.
pub struct TransferEngine {
    direction: TransferDirection,
    queue: Mutex<TransferQueue>,
    settings: Settings,
    executor: Arc<dyn TransferExecutor>,
    snapshot: watch::Sender<QueueSnapshot>,
    wake: Notify,
}

impl TransferEngine {
    /// Builds the engine and reloads items left Pending by a previous run.
    pub fn new(
        direction: TransferDirection,
        settings: Settings,
        executor: Arc<dyn TransferExecutor>,
    ) -> Self {
        let persisted: Vec<TransferItem> = settings.read_or_default(direction.store_key());
        let queue = TransferQueue::restore(direction, persisted);
        if !queue.is_empty() {
            tracing::info!(
                direction = direction.as_str(),
                count = queue.items().len(),
                "restored pending transfers"
            );
        }
        let (snapshot, _) = watch::channel(Arc::new(queue.items().to_vec()));
        Self {
            direction,
            queue: Mutex::new(queue),
            settings,
            executor,
            snapshot,
            wake: Notify::new(),
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn enqueue(
        &self,
        request: TransferRequest,
        target: FolderId,
    ) -> Result<TransferId, QueueError> {
        self.accepts(&request)?;
        let id = {
            let mut queue = self.queue.lock().await;
            let id = queue.enqueue(TransferItem::new(request, target));
            self.publish(&queue).await;
            id
        };
        tracing::debug!(direction = self.direction.as_str(), %id, "queued transfer");
        self.wake.notify_one();
        Ok(id)
    }

    /// Queues every request or none of them.
    pub async fn enqueue_many(
        &self,
        requests: Vec<(TransferRequest, FolderId)>,
    ) -> Result<Vec<TransferId>, QueueError> {
        for (request, _) in &requests {
            self.accepts(request)?;
        }
        let ids = {
            let mut queue = self.queue.lock().await;
            let ids: Vec<_> = requests
                .into_iter()
                .map(|(request, target)| queue.enqueue(TransferItem::new(request, target)))
                .collect();
            self.publish(&queue).await;
            ids
        };
        tracing::debug!(direction = self.direction.as_str(), count = ids.len(), "queued transfers");
        self.wake.notify_one();
        Ok(ids)
    }

    pub async fn clear_finished(&self) -> usize {
        let mut queue = self.queue.lock().await;
        let removed = queue.clear_finished();
        if removed > 0 {
            self.publish(&queue).await;
        }
        removed
    }

    pub async fn remove(&self, id: &TransferId) -> Result<TransferItem, QueueError> {
        let mut queue = self.queue.lock().await;
        let item = queue.remove(id)?;
        self.publish(&queue).await;
        Ok(item)
    }

    /// Starts the next Pending item and runs it to completion. Returns
    /// `false` when nothing could be started.
    pub async fn process_next(&self) -> bool {
        let started = {
            let mut queue = self.queue.lock().await;
            let started = queue.start_next();
            if started.is_some() {
                self.publish(&queue).await;
            }
            started
        };
        let Some(item) = started else {
            return false;
        };

        tracing::info!(
            direction = self.direction.as_str(),
            id = %item.id,
            name = %item.request.label(),
            "transfer started"
        );
        let outcome = self.executor.execute(&item).await;
        tracing::info!(
            direction = self.direction.as_str(),
            id = %item.id,
            ?outcome,
            "transfer finished"
        );

        let mut queue = self.queue.lock().await;
        if let Err(err) = queue.complete(&item.id, outcome) {
            tracing::warn!(direction = self.direction.as_str(), error = %err, "dropping transfer outcome");
        }
        self.publish(&queue).await;
        true
    }

    /// Drains the queue, then sleeps until new work arrives or `cancel`
    /// fires. A transfer already started always runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::debug!(direction = self.direction.as_str(), "transfer worker started");
        loop {
            while !cancel.is_cancelled() && self.process_next().await {}
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {}
            }
        }
        tracing::debug!(direction = self.direction.as_str(), "transfer worker stopped");
    }

    fn accepts(&self, request: &TransferRequest) -> Result<(), QueueError> {
        if request.direction() != self.direction {
            return Err(QueueError::WrongDirection {
                queue: self.direction,
                request: request.direction(),
            });
        }
        Ok(())
    }

    async fn publish(&self, queue: &TransferQueue) {
        self.snapshot
            .send_replace(Arc::new(queue.items().to_vec()));

        let settings = self.settings.clone();
        let key = self.direction.store_key();
        let pending = queue.pending();
        let write = move || settings.write_best_effort(key, &pending);
        if let Err(err) = tokio::task::spawn_blocking(write).await {
            tracing::warn!(direction = self.direction.as_str(), error = %err, "queue persistence task failed");
        }
    }
}
