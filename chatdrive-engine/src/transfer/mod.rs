mod engine;
mod executor;
mod item;
mod queue;

pub use engine::{QueueSnapshot, TransferEngine};
pub use executor::{DownloadExecutor, TransferExecutor, UploadExecutor};
pub use item::{
    TransferDirection, TransferId, TransferItem, TransferOutcome, TransferRequest, TransferStatus,
};
pub use queue::{QueueError, TransferQueue};
