#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use jd_app::{CacheDeps, JobListCache};
use jd_core::ports::{FetchError, FetcherPort, MutationExecutorPort, TransportError};
use jd_core::{
    CacheConfig, CollectionSnapshot, ExecutorResponse, FetchedPage, Job, JobId, JobStatus,
    MutationOp, QueryKey,
};
use jd_infra::{InMemoryJobBackend, SystemClock};

pub type Reply<T> = oneshot::Sender<T>;

/// A call the test has to answer by hand.
pub struct PendingCall<Req, Resp> {
    pub request: Req,
    pub reply: Reply<Resp>,
}

impl<Req, Resp> PendingCall<Req, Resp> {
    pub fn respond(self, response: Resp) {
        let _ = self.reply.send(response);
    }
}

pub type ExecutorCall =
    PendingCall<(MutationOp, Vec<JobId>), Result<ExecutorResponse, TransportError>>;

/// Executor whose calls stay pending until the test answers them.
pub struct ControlledExecutor {
    calls: mpsc::UnboundedSender<ExecutorCall>,
    count: AtomicUsize,
}

impl ControlledExecutor {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ExecutorCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: tx,
                count: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    pub fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MutationExecutorPort for ControlledExecutor {
    async fn run(
        &self,
        op: &MutationOp,
        target_ids: &[JobId],
    ) -> Result<ExecutorResponse, TransportError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let (reply, response) = oneshot::channel();
        let _ = self.calls.send(PendingCall {
            request: (op.clone(), target_ids.to_vec()),
            reply,
        });
        response
            .await
            .unwrap_or_else(|_| Err(TransportError::Connection("test dropped the call".into())))
    }
}

pub type FetchCall = PendingCall<QueryKey, Result<FetchedPage<Job>, FetchError>>;

/// Fetcher whose calls stay pending until the test answers them.
pub struct ControlledFetcher {
    calls: mpsc::UnboundedSender<FetchCall>,
}

impl ControlledFetcher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FetchCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls: tx }), rx)
    }
}

#[async_trait]
impl FetcherPort<Job> for ControlledFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<FetchedPage<Job>, FetchError> {
        let (reply, response) = oneshot::channel();
        let _ = self.calls.send(PendingCall {
            request: key.clone(),
            reply,
        });
        response
            .await
            .unwrap_or_else(|_| Err(FetchError::NotFound(key.clone())))
    }
}

pub fn key() -> QueryKey {
    QueryKey::from("jobs&page=0")
}

pub fn ids(raw: &[&str]) -> Vec<JobId> {
    raw.iter().map(|id| JobId::from(*id)).collect()
}

pub fn jobs(statuses: &[(&str, JobStatus)]) -> Vec<Job> {
    statuses
        .iter()
        .map(|(id, status)| Job::new(*id, format!("Job {id}"), *status))
        .collect()
}

pub fn page(items: Vec<Job>, total_count: u64) -> FetchedPage<Job> {
    FetchedPage { items, total_count }
}

/// Config with background refetches after mutations switched off, so tests
/// see exactly what reconciliation produced.
pub fn quiet_config() -> CacheConfig {
    CacheConfig {
        revalidate_after_mutation: false,
        ..CacheConfig::default()
    }
}

pub fn cache(
    executor: Arc<dyn MutationExecutorPort>,
    fetcher: Arc<dyn FetcherPort<Job>>,
    config: CacheConfig,
) -> JobListCache<Job> {
    JobListCache::from_deps(CacheDeps {
        executor,
        fetcher,
        clock: Arc::new(SystemClock),
        config,
    })
}

/// Cache whose snapshot for [`key`] is seeded from `seed` through a manual refresh.
pub async fn seeded_cache(
    executor: Arc<dyn MutationExecutorPort>,
    seed: Vec<Job>,
    config: CacheConfig,
) -> (JobListCache<Job>, Arc<InMemoryJobBackend>) {
    let backend = Arc::new(InMemoryJobBackend::new(seed));
    let cache = cache(executor, backend.clone(), config);
    cache.refresh(&key()).await.expect("seed fetch");
    (cache, backend)
}

/// Every snapshot delivered to a subscriber, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<CollectionSnapshot<Job>>>>,
}

impl Recorder {
    pub fn callback(&self) -> impl Fn(&CollectionSnapshot<Job>) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |snapshot| seen.lock().push(snapshot.clone())
    }

    pub fn all(&self) -> Vec<CollectionSnapshot<Job>> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<CollectionSnapshot<Job>> {
        self.seen.lock().last().cloned()
    }

    pub fn versions(&self) -> Vec<u64> {
        self.seen.lock().iter().map(|s| s.version).collect()
    }
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
