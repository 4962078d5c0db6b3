use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use jd_core::ports::{ClockPort, FetchError, FetcherPort, LifecycleSignal, LifecycleSignalReceiver};
use jd_core::revalidation::FetchTimeline;
use jd_core::{
    CacheConfig, CollectionItem, QueryKey, RevalidationDecision, RevalidationPolicy,
    RevalidationTrigger,
};

use crate::store::{ApplyOutcome, CollectionStore};

/// What a single revalidation did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationReport {
    /// New content was stored and published at `version`.
    Applied { version: u64 },
    /// The server returned what was already cached.
    Unchanged,
    /// A mutation is in flight on the key; the page waits for it.
    Held,
    /// A newer fetch was issued for the key before this one completed.
    Superseded,
    /// No fetch was issued.
    Skipped(RevalidationDecision),
}

#[derive(Debug, Default)]
struct KeyTimeline {
    /// Sequence number of the most recently issued fetch.
    latest_issued: u64,
    in_flight: usize,
    last_completed_ms: Option<i64>,
}

/// Decides when a cached collection is refetched and applies the results.
///
/// Results are applied in issuance order: a fetch that completes after a newer
/// one was issued for the same key is discarded.
pub struct RevalidationScheduler<T: CollectionItem> {
    store: Arc<CollectionStore<T>>,
    fetcher: Arc<dyn FetcherPort<T>>,
    clock: Arc<dyn ClockPort>,
    policy: RevalidationPolicy,
    revalidate_on_focus: bool,
    revalidate_on_reconnect: bool,
    timelines: Mutex<HashMap<QueryKey, KeyTimeline>>,
    online: AtomicBool,
}

/// Releases an in-flight slot if the fetch future is dropped before completing.
struct InFlightGuard<'a> {
    timelines: &'a Mutex<HashMap<QueryKey, KeyTimeline>>,
    key: &'a QueryKey,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(timeline) = self.timelines.lock().get_mut(self.key) {
                timeline.in_flight = timeline.in_flight.saturating_sub(1);
            }
        }
    }
}

impl<T: CollectionItem> RevalidationScheduler<T> {
    pub fn new(
        store: Arc<CollectionStore<T>>,
        fetcher: Arc<dyn FetcherPort<T>>,
        clock: Arc<dyn ClockPort>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
            policy: RevalidationPolicy::new(config.dedupe_interval_ms),
            revalidate_on_focus: config.revalidate_on_focus,
            revalidate_on_reconnect: config.revalidate_on_reconnect,
            timelines: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Refetch `key` if `trigger` warrants it and apply the result.
    ///
    /// Fetch errors leave the cache as it was and do not count as a completed
    /// fetch for dedupe purposes.
    #[tracing::instrument(
        name = "usecase.revalidation_scheduler.revalidate",
        skip(self),
        fields(key = %key, trigger = %trigger)
    )]
    pub async fn revalidate(
        &self,
        key: &QueryKey,
        trigger: RevalidationTrigger,
    ) -> Result<RevalidationReport, FetchError> {
        let seq = {
            let mut timelines = self.timelines.lock();
            let timeline = timelines.entry(key.clone()).or_default();
            let view = FetchTimeline {
                in_flight: timeline.in_flight > 0,
                last_completed_ms: timeline.last_completed_ms,
            };
            let decision = self.policy.decide(trigger, &view, self.clock.now_ms());
            if decision != RevalidationDecision::Fetch {
                debug!(?decision, "revalidation skipped");
                return Ok(RevalidationReport::Skipped(decision));
            }
            timeline.latest_issued += 1;
            timeline.in_flight += 1;
            timeline.latest_issued
        };

        let mut guard = InFlightGuard {
            timelines: &self.timelines,
            key,
            armed: true,
        };
        debug!(seq, "fetch issued");
        let fetched = self.fetcher.fetch(key).await;

        let (report, publish) = {
            let mut timelines = self.timelines.lock();
            guard.armed = false;
            let timeline = timelines.entry(key.clone()).or_default();
            timeline.in_flight = timeline.in_flight.saturating_sub(1);

            let page = match fetched {
                Ok(page) => page,
                Err(err) => {
                    drop(timelines);
                    warn!(seq, error = %err, "revalidation fetch failed");
                    return Err(err);
                }
            };

            if seq < timeline.latest_issued {
                debug!(seq, latest = timeline.latest_issued, "discarding superseded fetch");
                (RevalidationReport::Superseded, None)
            } else {
                timeline.last_completed_ms = Some(self.clock.now_ms());
                match self.store.apply_fetched(key, page) {
                    ApplyOutcome::Created(snapshot) | ApplyOutcome::Replaced(snapshot) => (
                        RevalidationReport::Applied {
                            version: snapshot.version,
                        },
                        Some(snapshot),
                    ),
                    ApplyOutcome::Unchanged => (RevalidationReport::Unchanged, None),
                    ApplyOutcome::Held => (RevalidationReport::Held, None),
                }
            }
        };

        if let Some(snapshot) = publish {
            self.store.emit(&snapshot);
        }
        info!(seq, ?report, "revalidation finished");
        Ok(report)
    }

    /// Revalidate every subscribed key in response to an environment event.
    pub async fn handle_signal(
        &self,
        signal: LifecycleSignal,
    ) -> Vec<(QueryKey, Result<RevalidationReport, FetchError>)> {
        let trigger = match signal {
            LifecycleSignal::FocusRegained if self.revalidate_on_focus => {
                RevalidationTrigger::FocusRegained
            }
            LifecycleSignal::FocusRegained => return Vec::new(),
            LifecycleSignal::ConnectivityLost => {
                self.online.store(false, Ordering::SeqCst);
                debug!("connectivity lost");
                return Vec::new();
            }
            LifecycleSignal::ConnectivityRestored => {
                let was_online = self.online.swap(true, Ordering::SeqCst);
                if was_online || !self.revalidate_on_reconnect {
                    return Vec::new();
                }
                RevalidationTrigger::Reconnected
            }
        };

        let keys = self.store.active_keys();
        debug!(signal = ?signal, keys = keys.len(), "revalidating subscribed keys");
        join_all(keys.into_iter().map(|key| async move {
            let report = self.revalidate(&key, trigger).await;
            (key, report)
        }))
        .await
    }

    /// Consume lifecycle signals until every sender is dropped.
    pub async fn run_signal_loop(self: Arc<Self>, mut signals: LifecycleSignalReceiver) {
        info!("revalidation signal loop started");
        while let Some(signal) = signals.recv().await {
            self.handle_signal(signal).await;
        }
        info!("revalidation signal loop stopped");
    }

    /// Schedule a background refetch after a mutation reconciled.
    pub fn rearm(self: &Arc<Self>, key: &QueryKey) -> Option<JoinHandle<()>> {
        self.spawn(key, RevalidationTrigger::AfterMutation)
    }

    /// Run a revalidation on the current runtime without waiting for it.
    ///
    /// Returns `None` when called outside a tokio runtime.
    pub fn spawn(
        self: &Arc<Self>,
        key: &QueryKey,
        trigger: RevalidationTrigger,
    ) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(key = %key, trigger = %trigger, "no runtime, revalidation not scheduled");
            return None;
        };

        let scheduler = Arc::clone(self);
        let key = key.clone();
        let span = info_span!("revalidation.spawned", key = %key, trigger = %trigger);
        Some(handle.spawn(
            async move {
                // Errors are already logged by `revalidate`.
                let _ = scheduler.revalidate(&key, trigger).await;
            }
            .instrument(span),
        ))
    }
}
