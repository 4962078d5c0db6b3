//! # Job List Cache / 任务列表缓存
//!
//! The facade the UI layer talks to. Owns one store, one selection tracker,
//! one coordinator and one scheduler, all built from [`CacheDeps`].
//! 由 [`CacheDeps`] 构造，界面层唯一入口。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use jd_core::ports::{FetchError, LifecycleSignal, LifecycleSignalReceiver};
use jd_core::{
    CollectionItem, CollectionSnapshot, JobId, MutationOp, MutationOutcome, QueryKey,
    RevalidationTrigger, SelectionSet,
};

use crate::deps::CacheDeps;
use crate::selection::SelectionTracker;
use crate::store::{CollectionStore, Subscription};
use crate::usecases::{MutationCoordinator, RevalidationReport, RevalidationScheduler};

pub struct JobListCache<T: CollectionItem> {
    store: Arc<CollectionStore<T>>,
    selection: Arc<SelectionTracker>,
    coordinator: MutationCoordinator<T>,
    scheduler: Arc<RevalidationScheduler<T>>,
}

impl<T: CollectionItem> JobListCache<T> {
    /// Wire the cache from its dependencies.
    /// 从依赖构造缓存。
    pub fn from_deps(deps: CacheDeps<T>) -> Self {
        let CacheDeps {
            executor,
            fetcher,
            clock,
            config,
        } = deps;

        let store = Arc::new(CollectionStore::new());
        let selection = Arc::new(SelectionTracker::new());
        let scheduler = Arc::new(RevalidationScheduler::new(
            store.clone(),
            fetcher,
            clock.clone(),
            &config,
        ));
        let coordinator = MutationCoordinator::new(
            store.clone(),
            selection.clone(),
            scheduler.clone(),
            executor,
            clock,
            &config,
        );

        info!(
            dedupe_interval_ms = config.dedupe_interval_ms,
            mutation_timeout_ms = config.mutation_timeout_ms,
            "job list cache ready"
        );

        Self {
            store,
            selection,
            coordinator,
            scheduler,
        }
    }

    /// Watch `key`. The callback sees the current snapshot right away if there
    /// is one, then every change. The first subscriber triggers a fetch.
    pub fn subscribe(
        &self,
        key: &QueryKey,
        callback: impl Fn(&CollectionSnapshot<T>) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let subscription = self.store.subscribe(key, callback);
        if subscription.is_first() {
            self.scheduler.spawn(key, RevalidationTrigger::Mount);
        }
        subscription
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<CollectionSnapshot<T>> {
        self.store.get(key)
    }

    pub async fn execute(
        &self,
        key: &QueryKey,
        op: MutationOp,
        target_ids: &[JobId],
    ) -> MutationOutcome {
        self.coordinator.execute(key, op, target_ids).await
    }

    pub async fn execute_with_timeout(
        &self,
        key: &QueryKey,
        op: MutationOp,
        target_ids: &[JobId],
        timeout: Duration,
    ) -> MutationOutcome {
        self.coordinator
            .execute_with_timeout(key, op, target_ids, timeout)
            .await
    }

    /// Run `op` on whatever is currently selected for `key`.
    pub async fn execute_selected(&self, key: &QueryKey, op: MutationOp) -> MutationOutcome {
        let targets = self.selection.get(key).ids();
        self.coordinator.execute(key, op, &targets).await
    }

    /// Explicit refresh, never deduped.
    pub async fn refresh(&self, key: &QueryKey) -> Result<RevalidationReport, FetchError> {
        self.scheduler
            .revalidate(key, RevalidationTrigger::Manual)
            .await
    }

    pub async fn handle_signal(&self, signal: LifecycleSignal) {
        self.scheduler.handle_signal(signal).await;
    }

    /// Feed lifecycle signals from `signals` to the scheduler in the background.
    pub fn spawn_signal_loop(&self, signals: LifecycleSignalReceiver) -> JoinHandle<()> {
        tokio::spawn(self.scheduler.clone().run_signal_loop(signals))
    }

    // Selection / 选择

    pub fn get_selection(&self, key: &QueryKey) -> SelectionSet {
        self.selection.get(key)
    }

    pub fn set_selection(&self, key: &QueryKey, id: JobId, selected: bool) {
        if selected {
            self.selection.select(key, id);
        } else {
            self.selection.deselect(key, &id);
        }
    }

    pub fn toggle(&self, key: &QueryKey, id: JobId) {
        self.selection.toggle(key, id);
    }

    /// Toggle every item currently visible under `key`.
    pub fn toggle_all(&self, key: &QueryKey) {
        let visible = self.store.get(key).map(|s| s.ids()).unwrap_or_default();
        self.selection.toggle_all(key, &visible);
    }

    pub fn clear_selection(&self, key: &QueryKey) {
        self.selection.clear(key);
    }

    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }
}
