use crate::ids::{JobId, MutationId};
use crate::mutation::MutationOp;
use crate::query::QueryKey;
use crate::snapshot::CollectionSnapshot;

/// A mutation that has been applied optimistically but not yet reconciled.
///
/// Owned exclusively by the coordinator for the lifetime of the attempt and
/// dropped once the result is reconciled.
#[derive(Debug, Clone)]
pub struct PendingMutation<T> {
    pub id: MutationId,
    pub key: QueryKey,
    pub op: MutationOp,
    pub target_ids: Vec<JobId>,
    /// What subscribers were shown while the request was in flight.
    pub optimistic_snapshot: Option<CollectionSnapshot<T>>,
    /// Exact pre-transform state, restored on total failure.
    pub rollback_snapshot: Option<CollectionSnapshot<T>>,
    pub started_at_ms: i64,
}

impl<T> PendingMutation<T> {
    /// Version of the published candidate, if one was published.
    pub fn candidate_version(&self) -> Option<u64> {
        self.optimistic_snapshot.as_ref().map(|s| s.version)
    }

    pub fn targets_overlap(&self, other: &[JobId]) -> bool {
        other.iter().any(|id| self.target_ids.contains(id))
    }
}
