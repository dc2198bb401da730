mod config_store;
mod settings;

pub use config_store::{ConfigStore, JsonFileStore, MemoryStore, StoreError};
pub use settings::{Settings, ViewMode, keys};
