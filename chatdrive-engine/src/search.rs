use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chatdrive_core::{Backend, FileEntry};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const MIN_QUERY_LEN: usize = 3;
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub min_query_len: usize,
    pub quiet_period: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: MIN_QUERY_LEN,
            quiet_period: QUIET_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Idle,
    /// Too short for a global search; filter the loaded listing instead.
    Local { query: String },
    /// Waiting out the quiet period or the backend.
    Pending { query: String },
    Results {
        query: String,
        files: Arc<Vec<FileEntry>>,
    },
}

#[derive(Default)]
struct Schedule {
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Debounced global search. Only the last input's results are published.
pub struct SearchCoordinator {
    backend: Arc<dyn Backend>,
    config: SearchConfig,
    state: watch::Sender<SearchState>,
    schedule: Mutex<Schedule>,
}

impl SearchCoordinator {
    pub fn new(backend: Arc<dyn Backend>, config: SearchConfig) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            backend,
            config,
            state,
            schedule: Mutex::new(Schedule::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Feeds a new value of the search box. Any scheduled search for an
    /// earlier value is cancelled.
    pub fn input(self: &Arc<Self>, query: &str) {
        let query = query.trim().to_string();
        let (generation, token) = {
            let mut schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = schedule.cancel.take() {
                previous.cancel();
            }
            schedule.generation += 1;
            if query.chars().count() < self.config.min_query_len {
                drop(schedule);
                self.state.send_replace(if query.is_empty() {
                    SearchState::Idle
                } else {
                    SearchState::Local { query }
                });
                return;
            }
            let token = CancellationToken::new();
            schedule.cancel = Some(token.clone());
            (schedule.generation, token)
        };

        self.state.send_replace(SearchState::Pending {
            query: query.clone(),
        });
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(this.config.quiet_period) => {}
            }
            let files = this.search_now(&query).await;
            let schedule = this.schedule.lock().unwrap_or_else(PoisonError::into_inner);
            if schedule.generation == generation {
                this.state.send_replace(SearchState::Results {
                    query,
                    files: Arc::new(files),
                });
            }
        });
    }

    /// Immediate global search. Failures yield no results.
    pub async fn search_now(&self, query: &str) -> Vec<FileEntry> {
        match self.backend.search_global(query).await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(query, error = %err, "global search failed");
                Vec::new()
            }
        }
    }
}

/// Case-insensitive name filter over an already loaded listing.
pub fn filter_local(files: &[FileEntry], query: &str) -> Vec<FileEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return files.to_vec();
    }
    files
        .iter()
        .filter(|file| file.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str) -> FileEntry {
        FileEntry {
            id,
            folder_id: None,
            name: name.to_string(),
            size: 0,
            mime_type: None,
            file_ext: None,
            created_at: String::new(),
            icon_type: String::new(),
        }
    }

    #[test]
    fn local_filter_is_case_insensitive() {
        let files = vec![entry(1, "Report.PDF"), entry(2, "photo.jpg")];
        let hits = filter_local(&files, "rep");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn blank_filter_keeps_everything() {
        let files = vec![entry(1, "a"), entry(2, "b")];
        assert_eq!(filter_local(&files, "  ").len(), 2);
    }
}
