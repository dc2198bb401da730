mod backend;
mod client;
mod types;

pub use backend::Backend;
pub use client::{BackendError, CommandClient, DEFAULT_PROBE_ADDR, ErrorClass};
pub use types::{BandwidthStats, FileEntry, Folder, FolderId};
