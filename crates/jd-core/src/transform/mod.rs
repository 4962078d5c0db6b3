//! Optimistic transform engine.
//!
//! Pure functions computing what a collection looks like once a mutation has
//! been applied. No I/O, no shared state: the coordinator decides when the
//! results are published.

mod merge;

pub use merge::merge_page;

use std::collections::HashSet;

use crate::ids::JobId;
use crate::job::CollectionItem;
use crate::mutation::MutationOp;
use crate::snapshot::CollectionSnapshot;

/// Apply `op` to `targets` on top of `snapshot`.
///
/// Every mutating op yields a snapshot with `version + 1` and `dirty = true`.
/// Read-only ops (export) return the snapshot untouched. Targets that are not
/// in `items` are skipped; that is not an error.
pub fn transform<T: CollectionItem>(
    snapshot: &CollectionSnapshot<T>,
    op: &MutationOp,
    targets: &[JobId],
) -> CollectionSnapshot<T> {
    if op.is_read_only() {
        return snapshot.clone();
    }

    let mut next = apply_op(snapshot, op, targets);
    next.version = snapshot.version + 1;
    next.dirty = true;
    next
}

/// Apply `op` to `targets` leaving `version` and `dirty` as they were.
///
/// Used to rebuild the confirmed state from the rollback snapshot; the caller
/// stamps the bookkeeping.
pub fn apply_op<T: CollectionItem>(
    snapshot: &CollectionSnapshot<T>,
    op: &MutationOp,
    targets: &[JobId],
) -> CollectionSnapshot<T> {
    let target_set: HashSet<&JobId> = targets.iter().collect();
    let mut next = snapshot.clone();

    #[cfg(feature = "tracing")]
    {
        let missing = targets.iter().filter(|id| !snapshot.contains(id)).count();
        if missing > 0 {
            tracing::debug!(
                key = %snapshot.key,
                missing,
                "transform skipped targets absent from snapshot"
            );
        }
    }

    match op {
        MutationOp::Archive | MutationOp::Delete | MutationOp::BulkDelete => {
            let before = next.items.len();
            next.items
                .retain(|item| !target_set.contains(item.item_id()));
            let removed = (before - next.items.len()) as u64;
            next.total_count = next.total_count.saturating_sub(removed);
        }
        MutationOp::BulkStatusChange { status } => {
            for item in next.items.iter_mut() {
                if target_set.contains(item.item_id()) {
                    item.set_status(status);
                }
            }
        }
        MutationOp::BulkAssign { assignee } => {
            for item in next.items.iter_mut() {
                if target_set.contains(item.item_id()) {
                    item.set_assignee(assignee.as_ref());
                }
            }
        }
        MutationOp::BulkExport { .. } => {}
    }

    next
}

/// Put the pre-mutation state of `ids` back into `current`.
///
/// Items present in `current` are overwritten with their `rollback` value.
/// Items that were removed are re-inserted after their nearest predecessor
/// (in rollback order) that is still present, or at the front, and counted
/// back into `total_count`. `version` and `dirty` are left as in `current`.
pub fn restore_from<T: CollectionItem>(
    current: &CollectionSnapshot<T>,
    rollback: &CollectionSnapshot<T>,
    ids: &[JobId],
) -> CollectionSnapshot<T> {
    let wanted: HashSet<&JobId> = ids.iter().collect();
    let mut next = current.clone();

    for (index, original) in rollback.items.iter().enumerate() {
        let id = original.item_id();
        if !wanted.contains(id) {
            continue;
        }

        if let Some(pos) = next.position(id) {
            next.items[pos] = original.clone();
            continue;
        }

        let insert_at = rollback.items[..index]
            .iter()
            .rev()
            .find_map(|prev| next.position(prev.item_id()))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        next.items.insert(insert_at, original.clone());
        next.total_count += 1;
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;
    use crate::job::{Assignee, Job, JobStatus};
    use crate::query::QueryKey;

    fn ids(raw: &[&str]) -> Vec<JobId> {
        raw.iter().map(|s| JobId::from(*s)).collect()
    }

    fn snapshot(total: u64) -> CollectionSnapshot<Job> {
        CollectionSnapshot {
            key: QueryKey::from("jobs"),
            items: vec![
                Job::new("1", "one", JobStatus::Active),
                Job::new("2", "two", JobStatus::Active),
                Job::new("3", "three", JobStatus::Pending),
            ],
            total_count: total,
            version: 4,
            dirty: false,
        }
    }

    #[test]
    fn test_delete_removes_targets_and_decrements_total() {
        let next = transform(&snapshot(10), &MutationOp::BulkDelete, &ids(&["1", "3"]));
        assert_eq!(next.ids(), ids(&["2"]));
        assert_eq!(next.total_count, 8);
        assert_eq!(next.version, 5);
        assert!(next.dirty);
    }

    #[test]
    fn test_total_count_floors_at_zero() {
        let next = transform(&snapshot(1), &MutationOp::Archive, &ids(&["1", "2"]));
        assert_eq!(next.total_count, 0);
    }

    #[test]
    fn test_status_change_only_touches_targets() {
        let next = transform(
            &snapshot(3),
            &MutationOp::BulkStatusChange {
                status: JobStatus::Completed,
            },
            &ids(&["2"]),
        );
        assert_eq!(next.items[0].status, JobStatus::Active);
        assert_eq!(next.items[1].status, JobStatus::Completed);
        assert_eq!(next.items[1].title, "two");
        assert_eq!(next.items[2].status, JobStatus::Pending);
    }

    #[test]
    fn test_assign_replaces_assignment_fields() {
        let assignee = Assignee {
            user_id: UserId::new("u9"),
            name: "Robin".into(),
            email: "robin@example.com".into(),
        };
        let next = transform(
            &snapshot(3),
            &MutationOp::BulkAssign {
                assignee: Some(assignee.clone()),
            },
            &ids(&["1", "3"]),
        );
        assert_eq!(next.items[0].assignee.as_ref(), Some(&assignee));
        assert!(next.items[1].assignee.is_none());
        assert_eq!(next.items[2].assignee.as_ref(), Some(&assignee));
    }

    #[test]
    fn test_unknown_targets_are_skipped() {
        let base = snapshot(3);
        let next = transform(&base, &MutationOp::Delete, &ids(&["42"]));
        assert!(next.same_content(&base));
        assert_eq!(next.version, base.version + 1);
    }

    #[test]
    fn test_export_is_identity() {
        let base = snapshot(3);
        let next = transform(
            &base,
            &MutationOp::BulkExport {
                format: crate::mutation::ExportFormat::Csv,
            },
            &ids(&["1"]),
        );
        assert_eq!(next, base);
    }

    #[test]
    fn test_restore_reinserts_removed_items_in_original_position() {
        let base = snapshot(10);
        let removed = transform(&base, &MutationOp::BulkDelete, &ids(&["1", "2"]));
        let restored = restore_from(&removed, &base, &ids(&["2"]));
        assert_eq!(restored.ids(), ids(&["2", "3"]));
        assert_eq!(restored.total_count, 9);

        let both = restore_from(&removed, &base, &ids(&["1", "2"]));
        assert_eq!(both.ids(), ids(&["1", "2", "3"]));
        assert_eq!(both.total_count, 10);
    }

    #[test]
    fn test_restore_overwrites_modified_fields() {
        let base = snapshot(3);
        let changed = transform(
            &base,
            &MutationOp::BulkStatusChange {
                status: JobStatus::Cancelled,
            },
            &ids(&["1", "2", "3"]),
        );
        let restored = restore_from(&changed, &base, &ids(&["3"]));
        assert_eq!(restored.items[0].status, JobStatus::Cancelled);
        assert_eq!(restored.items[2].status, JobStatus::Pending);
        assert_eq!(restored.version, changed.version);
    }
}
