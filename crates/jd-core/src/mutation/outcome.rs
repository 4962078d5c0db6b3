use serde::{Deserialize, Serialize};

use super::{BatchResult, ItemFailure, MutationKind};
use crate::ids::{JobId, MutationId};

/// How a mutation was reconciled into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Every target was confirmed; the optimistic state became truth.
    Committed,
    /// Some targets were confirmed; only those kept their change.
    PartiallyApplied,
    /// Nothing was confirmed; the pre-mutation state was restored.
    RolledBack,
}

/// Structured result handed back to the caller of `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub mutation_id: MutationId,
    pub kind: MutationKind,
    pub succeeded: Vec<JobId>,
    pub failed: Vec<ItemFailure>,
    pub resolution: Resolution,
}

impl MutationOutcome {
    pub fn from_batch(mutation_id: MutationId, kind: MutationKind, batch: BatchResult) -> Self {
        let resolution = Resolution::classify(&batch);
        Self {
            mutation_id,
            kind,
            succeeded: batch.succeeded_ids,
            failed: batch.failed,
            resolution,
        }
    }

    /// Outcome for a call that had nothing to do.
    pub fn empty(mutation_id: MutationId, kind: MutationKind) -> Self {
        Self {
            mutation_id,
            kind,
            succeeded: Vec::new(),
            failed: Vec::new(),
            resolution: Resolution::Committed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<JobId> {
        self.failed.iter().map(|f| f.id.clone()).collect()
    }

    /// Short line suitable for a toast, e.g. `"2 updated, 1 failed"`.
    pub fn summary(&self) -> String {
        format!("{} updated, {} failed", self.succeeded.len(), self.failed.len())
    }
}

impl Resolution {
    pub fn classify(batch: &BatchResult) -> Self {
        match (batch.succeeded_ids.is_empty(), batch.failed.is_empty()) {
            (_, true) => Self::Committed,
            (true, false) => Self::RolledBack,
            (false, false) => Self::PartiallyApplied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_covers_all_three_buckets() {
        let ok = BatchResult::all_succeeded(&["1".into()]);
        let bad = BatchResult::all_failed(&["1".into()], "LOCKED", "m");
        let mixed = BatchResult {
            succeeded_ids: vec!["1".into()],
            failed: vec![ItemFailure::new("2".into(), "LOCKED", "m")],
        };
        assert_eq!(Resolution::classify(&ok), Resolution::Committed);
        assert_eq!(Resolution::classify(&bad), Resolution::RolledBack);
        assert_eq!(Resolution::classify(&mixed), Resolution::PartiallyApplied);
    }

    #[test]
    fn test_summary_counts_both_sides() {
        let outcome = MutationOutcome::from_batch(
            MutationId::new(),
            MutationKind::BulkStatusChange,
            BatchResult {
                succeeded_ids: vec!["1".into(), "3".into()],
                failed: vec![ItemFailure::new("2".into(), "LOCKED", "m")],
            },
        );
        assert_eq!(outcome.summary(), "2 updated, 1 failed");
        assert_eq!(outcome.failed_ids(), vec![JobId::from("2")]);
    }
}
