//! Mutation coordinator.
//!
//! `execute` publishes the optimistic candidate before the executor is
//! called, then reconciles the server's answer against the rollback copy:
//!
//! - committed: keep the candidate, mark it clean
//! - rolled back: restore the rollback snapshot verbatim
//! - partially applied: replay the op on the rollback snapshot for the
//!   confirmed ids only
//!
//! When another mutation moved the snapshot on while this one was in flight,
//! the rejected ids are restored into the current snapshot instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use jd_core::mutation::error_codes;
use jd_core::ports::{ClockPort, MutationExecutorPort, TransportError};
use jd_core::transform::{apply_op, restore_from, transform};
use jd_core::{
    BatchResult, CacheConfig, CollectionItem, CollectionSnapshot, JobId, MutationId, MutationOp,
    MutationOutcome, PendingMutation, QueryKey, Resolution,
};

use super::single_flight::{Admission, SingleFlight};
use crate::selection::SelectionTracker;
use crate::store::CollectionStore;
use crate::usecases::revalidation::RevalidationScheduler;

/// Applies mutations optimistically and reconciles them with the server.
///
/// Cheap to clone; clones share the same in-flight registry.
pub struct MutationCoordinator<T: CollectionItem> {
    inner: Arc<CoordinatorInner<T>>,
}

impl<T: CollectionItem> Clone for MutationCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<T: CollectionItem> {
    store: Arc<CollectionStore<T>>,
    selection: Arc<SelectionTracker>,
    scheduler: Arc<RevalidationScheduler<T>>,
    executor: Arc<dyn MutationExecutorPort>,
    clock: Arc<dyn ClockPort>,
    flights: SingleFlight,
    default_timeout: Duration,
    revalidate_after_mutation: bool,
}

impl<T: CollectionItem> MutationCoordinator<T> {
    pub fn new(
        store: Arc<CollectionStore<T>>,
        selection: Arc<SelectionTracker>,
        scheduler: Arc<RevalidationScheduler<T>>,
        executor: Arc<dyn MutationExecutorPort>,
        clock: Arc<dyn ClockPort>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                selection,
                scheduler,
                executor,
                clock,
                flights: SingleFlight::default(),
                default_timeout: config.mutation_timeout(),
                revalidate_after_mutation: config.revalidate_after_mutation,
            }),
        }
    }

    /// Run `op` against `target_ids` with the configured timeout.
    pub async fn execute(
        &self,
        key: &QueryKey,
        op: MutationOp,
        target_ids: &[JobId],
    ) -> MutationOutcome {
        self.execute_with_timeout(key, op, target_ids, self.inner.default_timeout)
            .await
    }

    /// Run `op` against `target_ids`, rolling back if the executor has not
    /// answered within `timeout`.
    ///
    /// Never fails: transport errors, timeouts and per-item rejections all end
    /// up in the returned outcome.
    #[tracing::instrument(
        name = "usecase.mutation_coordinator.execute",
        skip(self, op, target_ids, timeout),
        fields(key = %key, kind = %op.kind(), targets = target_ids.len())
    )]
    pub async fn execute_with_timeout(
        &self,
        key: &QueryKey,
        op: MutationOp,
        target_ids: &[JobId],
        timeout: Duration,
    ) -> MutationOutcome {
        let kind = op.kind();
        let targets = dedupe(target_ids);
        let id = MutationId::new();

        if targets.is_empty() {
            debug!("no targets, nothing to do");
            return MutationOutcome::empty(id, kind);
        }

        loop {
            match self.inner.flights.admit(id, key, &op, &targets) {
                Admission::Lead => break,
                Admission::Join(outcome) => match outcome.await {
                    Ok(outcome) => return outcome,
                    // The leader vanished without an outcome; try again.
                    Err(_) => continue,
                },
                Admission::Wait(released) => {
                    let _ = released.await;
                }
            }
        }

        let pending = self.inner.begin(id, key, op, targets.clone());
        let fallback = pending.clone();

        let inner = Arc::clone(&self.inner);
        let span = info_span!("mutation.settle", mutation_id = %id);
        let settle = tokio::spawn(async move { inner.settle(pending, timeout).await }.instrument(span));

        match settle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(mutation_id = %id, error = %err, "settle task failed");
                let outcome = MutationOutcome::from_batch(
                    id,
                    kind,
                    BatchResult::all_failed(&targets, error_codes::INTERNAL_ERROR, &err.to_string()),
                );
                self.inner.abandon(&fallback, &outcome);
                outcome
            }
        }
    }

    /// Number of mutations currently holding targets.
    pub fn in_flight(&self) -> usize {
        self.inner.flights.in_flight()
    }
}

impl<T: CollectionItem> CoordinatorInner<T> {
    /// Take the rollback copy and publish the candidate.
    ///
    /// Read-only ops leave the store untouched.
    fn begin(
        &self,
        id: MutationId,
        key: &QueryKey,
        op: MutationOp,
        targets: Vec<JobId>,
    ) -> PendingMutation<T> {
        let (rollback_snapshot, optimistic_snapshot) = if op.is_read_only() {
            (None, None)
        } else {
            match self
                .store
                .begin_optimistic(key, id, &targets, |current| transform(current, &op, &targets))
            {
                Some((rollback, candidate)) => (Some(rollback), Some(candidate)),
                None => {
                    debug!(mutation_id = %id, "no cached snapshot, nothing to publish");
                    (None, None)
                }
            }
        };

        info!(
            mutation_id = %id,
            key = %key,
            kind = %op.kind(),
            targets = targets.len(),
            version = optimistic_snapshot.as_ref().map(|s| s.version),
            "optimistic mutation started"
        );

        PendingMutation {
            id,
            key: key.clone(),
            op,
            target_ids: targets,
            optimistic_snapshot,
            rollback_snapshot,
            started_at_ms: self.clock.now_ms(),
        }
    }

    async fn settle(self: Arc<Self>, pending: PendingMutation<T>, timeout: Duration) -> MutationOutcome {
        let batch = self.run_remote(&pending, timeout).await;
        let outcome = MutationOutcome::from_batch(pending.id, pending.op.kind(), batch);

        self.reconcile(&pending, &outcome);
        self.flights.finish(pending.id, &outcome);

        info!(
            mutation_id = %pending.id,
            resolution = ?outcome.resolution,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            elapsed_ms = self.clock.now_ms() - pending.started_at_ms,
            "mutation reconciled"
        );
        outcome
    }

    /// Unwind a mutation whose settle task died: restore the rollback copy,
    /// release held pages and free the targets.
    ///
    /// Safe to call after a partial settle; the store ignores a mutation it
    /// has already reconciled.
    fn abandon(self: &Arc<Self>, pending: &PendingMutation<T>, outcome: &MutationOutcome) {
        warn!(mutation_id = %pending.id, key = %pending.key, "abandoning mutation");
        self.reconcile(pending, outcome);
        self.flights.finish(pending.id, outcome);
    }

    /// Call the executor on its own task so a panic inside it becomes a
    /// failed outcome instead of tearing down reconciliation.
    async fn run_remote(&self, pending: &PendingMutation<T>, timeout: Duration) -> BatchResult {
        let targets = &pending.target_ids;
        let executor = Arc::clone(&self.executor);
        let op = pending.op.clone();
        let call_targets = targets.clone();
        let call = tokio::spawn(async move { executor.run(&op, &call_targets).await });

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(Ok(response))) => response.into_batch(targets),
            Ok(Ok(Err(err))) => {
                warn!(mutation_id = %pending.id, error = %err, "mutation transport failure");
                BatchResult::all_failed(targets, err.error_code(), &err.to_string())
            }
            Ok(Err(join_err)) => {
                error!(mutation_id = %pending.id, error = %join_err, "executor task failed");
                BatchResult::all_failed(targets, error_codes::INTERNAL_ERROR, &join_err.to_string())
            }
            Err(_) => {
                let err = TransportError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                };
                warn!(mutation_id = %pending.id, error = %err, "mutation timed out");
                BatchResult::all_failed(targets, err.error_code(), &err.to_string())
            }
        }
    }

    fn reconcile(self: &Arc<Self>, pending: &PendingMutation<T>, outcome: &MutationOutcome) {
        let kind = pending.op.kind();

        if !pending.op.is_read_only() {
            let reconciled = self
                .store
                .finish_optimistic(&pending.key, pending.id, |current, still_dirty| {
                    reconcile_snapshot(current, pending, outcome, still_dirty)
                });
            debug!(
                mutation_id = %pending.id,
                version = reconciled.as_ref().map(|s| s.version),
                "snapshot reconciled"
            );
        }

        self.selection
            .reconcile(&pending.key, kind, &pending.target_ids, &outcome.failed_ids());

        if !pending.op.is_read_only() && self.revalidate_after_mutation {
            self.scheduler.rearm(&pending.key);
        }
    }
}

/// Compute the confirmed snapshot for `pending` given the current one.
fn reconcile_snapshot<T: CollectionItem>(
    current: &CollectionSnapshot<T>,
    pending: &PendingMutation<T>,
    outcome: &MutationOutcome,
    still_dirty: bool,
) -> CollectionSnapshot<T> {
    let next_version = current.version + 1;
    let Some(rollback) = pending.rollback_snapshot.as_ref() else {
        return current.clone().with_bookkeeping(next_version, still_dirty);
    };

    let rebased = pending.candidate_version() != Some(current.version);
    if rebased {
        debug!(
            mutation_id = %pending.id,
            candidate = ?pending.candidate_version(),
            current = current.version,
            "snapshot moved while in flight, rebasing"
        );
    }

    let next = match (outcome.resolution, rebased) {
        (Resolution::Committed, _) => current.clone(),
        (Resolution::RolledBack, false) => rollback.clone(),
        (Resolution::PartiallyApplied, false) => apply_op(rollback, &pending.op, &outcome.succeeded),
        (_, true) => restore_from(current, rollback, &outcome.failed_ids()),
    };
    next.with_bookkeeping(next_version, still_dirty)
}

/// Drop repeated ids, keeping the first occurrence.
fn dedupe(ids: &[JobId]) -> Vec<JobId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}
