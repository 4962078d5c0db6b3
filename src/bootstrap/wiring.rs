//! # Dependency Injection / 依赖注入模块
//!
//! The only place that depends on `jd-app` and `jd-infra` together. Assembly
//! only: which backend, which clock, which config.
//! 仅负责组装，不做决策。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use jd_app::{CacheDeps, JobListCache};
use jd_core::ports::LifecycleSignalSender;
use jd_core::{AppConfig, Job};
use jd_infra::{InMemoryJobBackend, SystemClock};

const SIGNAL_BUFFER: usize = 32;

/// A cache wired to the in-memory backend, plus the handles the shell needs.
pub struct WiredCache {
    pub cache: JobListCache<Job>,
    /// The backend behind both ports, for injecting rejections.
    pub backend: Arc<InMemoryJobBackend>,
    /// Lifecycle events sent here reach the scheduler.
    pub signals: LifecycleSignalSender,
}

/// Wire a cache over `jobs`. Must be called inside a tokio runtime; the
/// lifecycle signal loop is spawned onto it.
pub fn wire_in_memory(config: &AppConfig, jobs: Vec<Job>) -> WiredCache {
    let backend = Arc::new(InMemoryJobBackend::new(jobs));

    let deps = CacheDeps {
        executor: backend.clone(),
        fetcher: backend.clone(),
        clock: Arc::new(SystemClock),
        config: config.cache.clone(),
    };
    let cache = JobListCache::from_deps(deps);

    let (signals, receiver) = mpsc::channel(SIGNAL_BUFFER);
    let _loop = cache.spawn_signal_loop(receiver);

    info!(jobs = backend.jobs().len(), "wired in-memory job backend");

    WiredCache {
        cache,
        backend,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jd_core::ports::LifecycleSignal;
    use jd_core::{JobQuery, JobStatus, MutationOp, Resolution};

    #[tokio::test]
    async fn test_wired_cache_serves_and_mutates_backend() {
        let jobs = vec![
            Job::new("1", "Replace filter", JobStatus::Active),
            Job::new("2", "Inspect roof", JobStatus::Pending),
        ];
        let wired = wire_in_memory(&AppConfig::default(), jobs);
        let key = JobQuery::default().key();

        wired.cache.refresh(&key).await.unwrap();
        assert_eq!(wired.cache.snapshot(&key).unwrap().items.len(), 2);

        wired.backend.reject("2", "LOCKED");
        let outcome = wired
            .cache
            .execute(
                &key,
                MutationOp::BulkStatusChange {
                    status: JobStatus::Completed,
                },
                &["1".into(), "2".into()],
            )
            .await;
        assert_eq!(outcome.resolution, Resolution::PartiallyApplied);
        assert_eq!(wired.backend.jobs()[0].status, JobStatus::Completed);
        assert_eq!(wired.backend.jobs()[1].status, JobStatus::Pending);

        wired
            .signals
            .send(LifecycleSignal::FocusRegained)
            .await
            .unwrap();
    }
}
