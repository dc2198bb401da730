use thiserror::Error;

use super::item::{TransferDirection, TransferId, TransferItem, TransferOutcome, TransferStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no transfer with id {0}")]
    UnknownItem(TransferId),
    #[error("transfer {0} is in flight")]
    InFlight(TransferId),
    #[error("transfer {0} is not in flight")]
    NotInFlight(TransferId),
    #[error("{request:?} request does not belong in the {queue:?} queue")]
    WrongDirection {
        queue: TransferDirection,
        request: TransferDirection,
    },
}

/// Insertion-ordered transfer list for one direction with a single
/// in-flight slot.
#[derive(Debug)]
pub struct TransferQueue {
    direction: TransferDirection,
    items: Vec<TransferItem>,
    next_seq: u64,
}

impl TransferQueue {
    pub fn new(direction: TransferDirection) -> Self {
        Self {
            direction,
            items: Vec::new(),
            next_seq: 0,
        }
    }

    /// Rebuilds a queue from persisted items. Anything that is not Pending
    /// is dropped.
    pub fn restore(direction: TransferDirection, items: Vec<TransferItem>) -> Self {
        let items = items
            .into_iter()
            .filter(|item| item.status == TransferStatus::Pending)
            .filter(|item| item.direction() == direction)
            .map(|mut item| {
                item.started_seq = None;
                item.error = None;
                item
            })
            .collect();
        Self {
            direction,
            items,
            next_seq: 0,
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends the item as Pending. Duplicates are kept.
    pub fn enqueue(&mut self, mut item: TransferItem) -> TransferId {
        item.status = TransferStatus::Pending;
        item.error = None;
        item.started_seq = None;
        let id = item.id.clone();
        self.items.push(item);
        id
    }

    pub fn in_flight(&self) -> Option<&TransferItem> {
        self.items
            .iter()
            .find(|item| item.status == TransferStatus::InFlight)
    }

    /// Moves the oldest Pending item to InFlight when the slot is free.
    pub fn start_next(&mut self) -> Option<TransferItem> {
        if self.in_flight().is_some() {
            return None;
        }
        let seq = self.next_seq;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.status == TransferStatus::Pending)?;
        item.status = TransferStatus::InFlight;
        item.started_seq = Some(seq);
        self.next_seq += 1;
        Some(item.clone())
    }

    /// Records the outcome of the in-flight item. Only `Declined` removes it.
    pub fn complete(
        &mut self,
        id: &TransferId,
        outcome: TransferOutcome,
    ) -> Result<(), QueueError> {
        let index = self.position(id)?;
        if self.items[index].status != TransferStatus::InFlight {
            return Err(QueueError::NotInFlight(id.clone()));
        }
        match outcome {
            TransferOutcome::Success => {
                let item = &mut self.items[index];
                item.status = TransferStatus::Success;
                item.error = None;
            }
            TransferOutcome::Failed(error) => {
                let item = &mut self.items[index];
                item.status = TransferStatus::Failed;
                item.error = Some(error);
            }
            TransferOutcome::Declined => {
                self.items.remove(index);
            }
        }
        Ok(())
    }

    /// Drops finished items per the direction's policy; returns how many.
    pub fn clear_finished(&mut self) -> usize {
        let clears_failed = self.direction.clears_failed();
        let before = self.items.len();
        self.items.retain(|item| {
            !item.status.is_finished()
                || (item.status == TransferStatus::Failed && !clears_failed)
        });
        before - self.items.len()
    }

    pub fn remove(&mut self, id: &TransferId) -> Result<TransferItem, QueueError> {
        let index = self.position(id)?;
        if self.items[index].status == TransferStatus::InFlight {
            return Err(QueueError::InFlight(id.clone()));
        }
        Ok(self.items.remove(index))
    }

    /// The subset that survives a restart.
    pub fn pending(&self) -> Vec<TransferItem> {
        self.items
            .iter()
            .filter(|item| item.status == TransferStatus::Pending)
            .cloned()
            .collect()
    }

    fn position(&self, id: &TransferId) -> Result<usize, QueueError> {
        self.items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| QueueError::UnknownItem(id.clone()))
    }
}
