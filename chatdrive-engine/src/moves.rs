use std::sync::Arc;

use chatdrive_core::{Backend, BackendError, FolderId};

use crate::listing::ListingCache;
use crate::prompt::Notifier;
use crate::selection::SelectionSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    /// Dropped onto the folder being viewed.
    NoOp,
    /// The whole selection moves; it is cleared afterwards.
    Selection {
        ids: Vec<i64>,
        source: FolderId,
        target: FolderId,
    },
    /// Only the dragged item moves; the selection is left alone.
    Single {
        id: i64,
        source: FolderId,
        target: FolderId,
    },
}

impl MovePlan {
    pub fn ids(&self) -> Vec<i64> {
        match self {
            MovePlan::NoOp => Vec::new(),
            MovePlan::Selection { ids, .. } => ids.clone(),
            MovePlan::Single { id, .. } => vec![*id],
        }
    }
}

/// Works out what a drop of `dragged` onto `target` moves.
pub fn resolve(
    selection: &SelectionSet,
    dragged: i64,
    target: FolderId,
    active: FolderId,
) -> MovePlan {
    if target == active {
        return MovePlan::NoOp;
    }
    if selection.contains(dragged) {
        MovePlan::Selection {
            ids: selection.ids().to_vec(),
            source: active,
            target,
        }
    } else {
        MovePlan::Single {
            id: dragged,
            source: active,
            target,
        }
    }
}

/// Plan for moving the current selection through the move dialog.
pub fn resolve_selection(selection: &SelectionSet, target: FolderId, active: FolderId) -> MovePlan {
    if target == active || selection.is_empty() {
        return MovePlan::NoOp;
    }
    MovePlan::Selection {
        ids: selection.ids().to_vec(),
        source: active,
        target,
    }
}

pub struct MoveResolver {
    backend: Arc<dyn Backend>,
    listings: Arc<ListingCache>,
    notifier: Arc<dyn Notifier>,
}

impl MoveResolver {
    pub fn new(
        backend: Arc<dyn Backend>,
        listings: Arc<ListingCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            listings,
            notifier,
        }
    }

    /// Sends the plan as one `move_files` call. Returns how many items
    /// moved; `NoOp` never reaches the backend.
    pub async fn execute(
        &self,
        plan: &MovePlan,
        selection: &mut SelectionSet,
    ) -> Result<usize, BackendError> {
        let (ids, source, target) = match plan {
            MovePlan::NoOp => return Ok(0),
            MovePlan::Selection {
                ids,
                source,
                target,
            } => (ids.clone(), *source, *target),
            MovePlan::Single { id, source, target } => (vec![*id], *source, *target),
        };

        if let Err(err) = self.backend.move_files(&ids, source, target).await {
            self.notifier
                .error(&format!("Failed to move file(s): {err}"));
            return Err(err);
        }

        if matches!(plan, MovePlan::Selection { .. }) {
            selection.clear();
        }
        self.listings.invalidate(source).await;
        self.listings.invalidate(target).await;
        self.notifier
            .success(&format!("Moved {} files.", ids.len()));
        tracing::info!(count = ids.len(), ?source, ?target, "moved files");
        Ok(ids.len())
    }
}
