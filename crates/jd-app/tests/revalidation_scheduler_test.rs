//! Revalidation Scheduler Tests
//! 重新验证调度测试

mod common;

use std::sync::Arc;

use tokio::sync::mpsc;

use jd_app::RevalidationReport;
use jd_core::ports::{FetchError, LifecycleSignal, TransportError};
use jd_core::{CacheConfig, ExecutorResponse, JobStatus, MutationOp, Resolution, SingleResult};
use jd_infra::InMemoryJobBackend;

use common::*;

#[tokio::test]
async fn test_identical_refetch_changes_nothing() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[
        ("1", JobStatus::Active),
        ("2", JobStatus::OnHold),
    ])));
    let cache = cache(backend.clone(), backend.clone(), CacheConfig::default());
    let recorder = Recorder::default();

    assert_eq!(
        cache.refresh(&key()).await.unwrap(),
        RevalidationReport::Applied { version: 1 }
    );
    let _sub = cache.subscribe(&key(), recorder.callback());
    assert_eq!(
        cache.refresh(&key()).await.unwrap(),
        RevalidationReport::Unchanged
    );

    assert_eq!(cache.snapshot(&key()).unwrap().version, 1);
    assert_eq!(recorder.versions(), vec![1]);
    assert_eq!(backend.fetch_calls(), 2);
}

#[tokio::test]
async fn test_first_subscriber_triggers_a_fetch_and_later_ones_do_not() {
    let (executor, _calls) = ControlledExecutor::new();
    let (fetcher, mut fetches) = ControlledFetcher::new();
    let cache = cache(executor, fetcher, CacheConfig::default());
    let recorder = Recorder::default();

    let _first = cache.subscribe(&key(), recorder.callback());
    let fetch = fetches.recv().await.unwrap();
    assert_eq!(fetch.request, key());
    fetch.respond(Ok(page(jobs(&[("1", JobStatus::Active)]), 1)));
    settle().await;
    assert_eq!(recorder.versions(), vec![1]);

    let late = Recorder::default();
    let _second = cache.subscribe(&key(), late.callback());
    settle().await;
    assert_eq!(late.versions(), vec![1]);
    assert!(fetches.try_recv().is_err());
}

#[tokio::test]
async fn test_focus_within_the_dedupe_window_is_ignored() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[("1", JobStatus::Active)])));
    let cache = cache(backend.clone(), backend.clone(), CacheConfig::default());
    let _sub = cache.subscribe(&key(), |_| {});
    settle().await;
    assert_eq!(backend.fetch_calls(), 1);

    cache.handle_signal(LifecycleSignal::FocusRegained).await;
    assert_eq!(backend.fetch_calls(), 1);

    cache.refresh(&key()).await.unwrap();
    assert_eq!(backend.fetch_calls(), 2);
}

#[tokio::test]
async fn test_most_recently_issued_fetch_wins() {
    let (executor, _calls) = ControlledExecutor::new();
    let (fetcher, mut fetches) = ControlledFetcher::new();
    let cache = Arc::new(cache(executor, fetcher, CacheConfig::default()));

    let older = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh(&key()).await }
    });
    let older_fetch = fetches.recv().await.unwrap();
    let newer = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh(&key()).await }
    });
    let newer_fetch = fetches.recv().await.unwrap();

    newer_fetch.respond(Ok(page(jobs(&[("1", JobStatus::Completed)]), 1)));
    assert_eq!(
        newer.await.unwrap().unwrap(),
        RevalidationReport::Applied { version: 1 }
    );

    older_fetch.respond(Ok(page(jobs(&[("1", JobStatus::Active)]), 1)));
    assert_eq!(older.await.unwrap().unwrap(), RevalidationReport::Superseded);

    let snapshot = cache.snapshot(&key()).unwrap();
    assert_eq!(snapshot.items[0].status, JobStatus::Completed);
    assert_eq!(snapshot.version, 1);
}

#[tokio::test]
async fn test_fetch_during_a_mutation_is_held_then_merged() {
    let (executor, mut calls) = ControlledExecutor::new();
    let (fetcher, mut fetches) = ControlledFetcher::new();
    let cache = Arc::new(cache(executor, fetcher, quiet_config()));

    let seed = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh(&key()).await }
    });
    fetches.recv().await.unwrap().respond(Ok(page(
        jobs(&[("1", JobStatus::Active), ("2", JobStatus::Active)]),
        2,
    )));
    seed.await.unwrap().unwrap();

    let mutation = tokio::spawn({
        let cache = cache.clone();
        async move {
            cache
                .execute(
                    &key(),
                    MutationOp::BulkStatusChange {
                        status: JobStatus::Completed,
                    },
                    &ids(&["1"]),
                )
                .await
        }
    });
    let call = calls.recv().await.unwrap();
    let candidate = cache.snapshot(&key()).unwrap();

    let refresh = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh(&key()).await }
    });
    // The server has not applied the mutation yet but someone else put job 2 on hold.
    fetches.recv().await.unwrap().respond(Ok(page(
        jobs(&[("1", JobStatus::Active), ("2", JobStatus::OnHold)]),
        2,
    )));
    assert_eq!(refresh.await.unwrap().unwrap(), RevalidationReport::Held);
    assert_eq!(cache.snapshot(&key()).unwrap(), candidate);

    call.respond(Ok(ExecutorResponse::Single(SingleResult::Ok)));
    assert_eq!(mutation.await.unwrap().resolution, Resolution::Committed);

    let merged = cache.snapshot(&key()).unwrap();
    assert_eq!(merged.items[0].status, JobStatus::Completed);
    assert_eq!(merged.items[1].status, JobStatus::OnHold);
    assert!(!merged.dirty);
    assert_eq!(merged.version, candidate.version + 1);
}

#[tokio::test]
async fn test_failed_fetch_leaves_the_cache_alone() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[("1", JobStatus::Active)])));
    let cache = cache(backend.clone(), backend.clone(), CacheConfig::default());
    cache.refresh(&key()).await.unwrap();

    backend.fail_transport(Some(TransportError::Timeout { after_ms: 10_000 }));
    backend.set_status(&jd_core::JobId::from("1"), JobStatus::Cancelled);
    let err = cache.refresh(&key()).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(TransportError::Timeout { .. })));
    assert_eq!(cache.snapshot(&key()).unwrap().items[0].status, JobStatus::Active);

    backend.fail_transport(None);
    assert_eq!(
        cache.refresh(&key()).await.unwrap(),
        RevalidationReport::Applied { version: 2 }
    );
}

#[tokio::test]
async fn test_mutation_rearms_revalidation_with_server_truth() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[
        ("1", JobStatus::Active),
        ("2", JobStatus::Active),
    ])));
    let cache = cache(backend.clone(), backend.clone(), CacheConfig::default());
    cache.refresh(&key()).await.unwrap();

    cache
        .execute(&key(), MutationOp::Archive, &ids(&["1"]))
        .await;
    settle().await;

    assert_eq!(backend.fetch_calls(), 2);
    let snapshot = cache.snapshot(&key()).unwrap();
    assert_eq!(snapshot.ids(), ids(&["2"]));
    assert_eq!(snapshot.total_count, 1);
}

#[tokio::test]
async fn test_signal_loop_revalidates_subscribed_keys() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[("1", JobStatus::Active)])));
    let config = CacheConfig {
        dedupe_interval_ms: 0,
        ..CacheConfig::default()
    };
    let cache = cache(backend.clone(), backend.clone(), config);
    let _sub = cache.subscribe(&key(), |_| {});
    settle().await;
    assert_eq!(backend.fetch_calls(), 1);

    let (signals, receiver) = mpsc::channel(8);
    let pump = cache.spawn_signal_loop(receiver);

    signals.send(LifecycleSignal::FocusRegained).await.unwrap();
    signals.send(LifecycleSignal::ConnectivityRestored).await.unwrap();
    signals.send(LifecycleSignal::ConnectivityLost).await.unwrap();
    signals.send(LifecycleSignal::ConnectivityRestored).await.unwrap();
    drop(signals);
    pump.await.unwrap();

    // focus + reconnect after the loss; the first restore had no loss before it
    assert_eq!(backend.fetch_calls(), 3);
}

#[tokio::test]
async fn test_focus_revalidation_can_be_switched_off() {
    let backend = Arc::new(InMemoryJobBackend::new(jobs(&[("1", JobStatus::Active)])));
    let config = CacheConfig {
        dedupe_interval_ms: 0,
        revalidate_on_focus: false,
        ..CacheConfig::default()
    };
    let cache = cache(backend.clone(), backend.clone(), config);
    let _sub = cache.subscribe(&key(), |_| {});
    settle().await;

    cache.handle_signal(LifecycleSignal::FocusRegained).await;
    assert_eq!(backend.fetch_calls(), 1);
}
