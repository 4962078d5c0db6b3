//! Selection of collection members for the next batch operation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::JobId;

/// The ids currently chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    selected_ids: BTreeSet<JobId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = JobId>>(ids: I) -> Self {
        Self {
            selected_ids: ids.into_iter().collect(),
        }
    }

    pub fn select(&mut self, id: JobId) {
        self.selected_ids.insert(id);
    }

    pub fn deselect(&mut self, id: &JobId) {
        self.selected_ids.remove(id);
    }

    pub fn toggle(&mut self, id: JobId) {
        if !self.selected_ids.remove(&id) {
            self.selected_ids.insert(id);
        }
    }

    /// Select every visible id, or clear them all if they already are.
    pub fn toggle_all(&mut self, visible: &[JobId]) {
        let all_selected = !visible.is_empty() && visible.iter().all(|id| self.contains(id));
        if all_selected {
            for id in visible {
                self.selected_ids.remove(id);
            }
        } else {
            self.selected_ids.extend(visible.iter().cloned());
        }
    }

    pub fn clear(&mut self) {
        self.selected_ids.clear();
    }

    /// Overwrite the selection wholesale.
    pub fn replace(&mut self, ids: &[JobId]) {
        self.selected_ids = ids.iter().cloned().collect();
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.selected_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_ids.is_empty()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.selected_ids.iter().cloned().collect()
    }
}
