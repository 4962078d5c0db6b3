//! Per-key selection state.
//!
//! User-facing operations only add, remove or toggle. The mutation
//! coordinator is the one writer allowed to overwrite a selection outright,
//! through [`SelectionTracker::reconcile`].

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use jd_core::{JobId, MutationKind, QueryKey, SelectionSet};

#[derive(Default)]
pub struct SelectionTracker {
    sets: Mutex<HashMap<QueryKey, SelectionSet>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> SelectionSet {
        self.sets.lock().get(key).cloned().unwrap_or_default()
    }

    pub fn select(&self, key: &QueryKey, id: JobId) {
        self.sets.lock().entry(key.clone()).or_default().select(id);
    }

    pub fn deselect(&self, key: &QueryKey, id: &JobId) {
        if let Some(set) = self.sets.lock().get_mut(key) {
            set.deselect(id);
        }
    }

    pub fn toggle(&self, key: &QueryKey, id: JobId) {
        self.sets.lock().entry(key.clone()).or_default().toggle(id);
    }

    /// Select every visible id, or clear them all if they already are.
    pub fn toggle_all(&self, key: &QueryKey, visible: &[JobId]) {
        self.sets
            .lock()
            .entry(key.clone())
            .or_default()
            .toggle_all(visible);
    }

    pub fn clear(&self, key: &QueryKey) {
        if let Some(set) = self.sets.lock().get_mut(key) {
            set.clear();
        }
    }

    /// Authoritative post-mutation write.
    ///
    /// A full success deselects the targets and leaves the rest of the
    /// selection alone. Otherwise batch kinds leave exactly the failed ids
    /// selected, and single-item kinds re-select their target for a retry.
    pub(crate) fn reconcile(
        &self,
        key: &QueryKey,
        kind: MutationKind,
        targets: &[JobId],
        failed: &[JobId],
    ) {
        let mut sets = self.sets.lock();
        let set = sets.entry(key.clone()).or_default();

        if failed.is_empty() {
            for id in targets {
                set.deselect(id);
            }
        } else if kind.is_batch() {
            set.replace(failed);
        } else {
            set.replace(targets);
        }

        debug!(key = %key, kind = %kind, selected = set.len(), "selection reconciled");
    }
}
