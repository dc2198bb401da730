mod folders;
mod health;
mod manager;
mod state;

pub use folders::merge_folders;
pub use health::{DEFAULT_POLL_INTERVAL, NetworkMonitor};
pub use manager::{FailureAttribution, FolderDeletion, SessionError, SessionManager};
pub use state::{SessionEvent, SessionPhase, SessionState};
