//! In-memory job backend.
//!
//! Serves both ports from one job list so that a mutation is visible to the
//! next fetch. Rejections and transport failures can be injected per id or
//! per call, which is what the CLI's `--reject` flag and the tests use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};

use jd_core::ports::{FetchError, FetcherPort, MutationExecutorPort, TransportError};
use jd_core::{
    BatchResult, CollectionItem, ExecutorResponse, ExportFormat, FetchedPage, ItemFailure, Job,
    JobId, JobQuery, JobStatus, MutationOp, QueryKey, QueryKeyError, SingleResult,
};

#[derive(Default)]
struct BackendState {
    jobs: Vec<Job>,
    archived: Vec<Job>,
    rejections: HashMap<JobId, String>,
    transport_failure: Option<TransportError>,
    exports: Vec<(ExportFormat, Vec<JobId>)>,
}

pub struct InMemoryJobBackend {
    state: Mutex<BackendState>,
    latency: Duration,
    fetch_calls: AtomicUsize,
    run_calls: AtomicUsize,
}

impl InMemoryJobBackend {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            state: Mutex::new(BackendState {
                jobs,
                ..BackendState::default()
            }),
            latency: Duration::ZERO,
            fetch_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Refuse any mutation of `id` with `error_code`.
    pub fn reject(&self, id: impl Into<JobId>, error_code: impl Into<String>) {
        self.state
            .lock()
            .rejections
            .insert(id.into(), error_code.into());
    }

    pub fn clear_rejections(&self) {
        self.state.lock().rejections.clear();
    }

    /// Fail every following call with `error` until reset with `None`.
    pub fn fail_transport(&self, error: Option<TransportError>) {
        self.state.lock().transport_failure = error;
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.state.lock().jobs.clone()
    }

    pub fn archived(&self) -> Vec<Job> {
        self.state.lock().archived.clone()
    }

    pub fn exports(&self) -> Vec<(ExportFormat, Vec<JobId>)> {
        self.state.lock().exports.clone()
    }

    /// Replace a job's status behind the cache's back.
    pub fn set_status(&self, id: &JobId, status: JobStatus) {
        if let Some(job) = self.state.lock().jobs.iter_mut().find(|j| &j.id == id) {
            job.status = status;
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn apply(state: &mut BackendState, op: &MutationOp, id: &JobId) {
        let now = Utc::now();
        match op {
            MutationOp::Archive => {
                if let Some(pos) = state.jobs.iter().position(|j| &j.id == id) {
                    let job = state.jobs.remove(pos);
                    state.archived.push(job);
                }
            }
            MutationOp::Delete | MutationOp::BulkDelete => {
                state.jobs.retain(|j| &j.id != id);
            }
            MutationOp::BulkStatusChange { status } => {
                if let Some(job) = state.jobs.iter_mut().find(|j| &j.id == id) {
                    job.set_status(status);
                    job.updated_at = now;
                }
            }
            MutationOp::BulkAssign { assignee } => {
                if let Some(job) = state.jobs.iter_mut().find(|j| &j.id == id) {
                    job.set_assignee(assignee.as_ref());
                    job.updated_at = now;
                }
            }
            MutationOp::BulkExport { .. } => {}
        }
    }
}

/// Rows matching the filters encoded in a `jobs&...` key, then paged.
fn select_page(jobs: &[Job], key: &QueryKey) -> Result<FetchedPage<Job>, FetchError> {
    let query = JobQuery::from_key(key).map_err(|err| match err {
        QueryKeyError::NotAJobQuery(key) => FetchError::NotFound(key),
        QueryKeyError::Malformed(segment) => FetchError::Decode(segment),
    })?;

    let status = match query.filters.get("status") {
        Some(value) => Some(
            JobStatus::parse(value)
                .ok_or_else(|| FetchError::Decode(format!("unknown status filter: {value}")))?,
        ),
        None => None,
    };
    let site = query.filters.get("site").map(String::as_str);
    let search = query.search.as_deref().map(str::to_lowercase);

    let matching: Vec<&Job> = jobs
        .iter()
        .filter(|j| status.map_or(true, |s| j.status == s))
        .filter(|j| site.map_or(true, |s| j.site.as_deref() == Some(s)))
        .filter(|j| {
            search
                .as_deref()
                .map_or(true, |q| j.title.to_lowercase().contains(q))
        })
        .collect();

    let total_count = matching.len() as u64;
    let items = match query.page_size {
        Some(size) => {
            let size = size as usize;
            matching
                .into_iter()
                .skip((query.page as usize).saturating_mul(size))
                .take(size)
                .cloned()
                .collect()
        }
        None => matching.into_iter().cloned().collect(),
    };

    Ok(FetchedPage { items, total_count })
}

#[async_trait]
impl FetcherPort<Job> for InMemoryJobBackend {
    async fn fetch(&self, key: &QueryKey) -> Result<FetchedPage<Job>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let state = self.state.lock();
        if let Some(err) = state.transport_failure.clone() {
            return Err(err.into());
        }
        let page = select_page(&state.jobs, key)?;
        debug!(key = %key, items = page.items.len(), total = page.total_count, "served page");
        Ok(page)
    }
}

#[async_trait]
impl MutationExecutorPort for InMemoryJobBackend {
    async fn run(
        &self,
        op: &MutationOp,
        target_ids: &[JobId],
    ) -> Result<ExecutorResponse, TransportError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let mut state = self.state.lock();
        if let Some(err) = state.transport_failure.clone() {
            return Err(err);
        }

        let mut batch = BatchResult::default();
        for id in target_ids {
            if let Some(code) = state.rejections.get(id).cloned() {
                batch
                    .failed
                    .push(ItemFailure::new(id.clone(), code, format!("job {id} was rejected")));
                continue;
            }
            let known = state.jobs.iter().any(|j| &j.id == id);
            if !known {
                // Unknown ids are left out of the response entirely.
                continue;
            }
            Self::apply(&mut state, op, id);
            batch.succeeded_ids.push(id.clone());
        }

        if let MutationOp::BulkExport { format } = op {
            state.exports.push((*format, batch.succeeded_ids.clone()));
        }

        info!(
            kind = %op.kind(),
            succeeded = batch.succeeded_ids.len(),
            failed = batch.failed.len(),
            "backend applied mutation"
        );

        if op.kind().is_batch() {
            return Ok(ExecutorResponse::Batch(batch));
        }
        Ok(match batch.failed.into_iter().next() {
            Some(failure) => ExecutorResponse::Single(SingleResult::Err {
                error_code: failure.error_code,
                message: failure.message,
            }),
            None if batch.succeeded_ids.is_empty() => ExecutorResponse::Single(SingleResult::Err {
                error_code: jd_core::mutation::error_codes::NOT_FOUND.to_string(),
                message: "job not found".to_string(),
            }),
            None => ExecutorResponse::Single(SingleResult::Ok),
        })
    }
}
