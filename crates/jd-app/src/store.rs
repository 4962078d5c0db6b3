//! Collection store: the cache entries for every query key.
//!
//! The store is an explicit handle shared by the coordinator, the scheduler
//! and the facade. All writes to a key happen under one lock so that an
//! optimistic publish and a revalidation result can never interleave; the
//! lock is never held while subscriber callbacks run.
//!
//! ## Lock Ordering
//! Callers that hold their own lock while writing here (the scheduler does)
//! must take theirs first. The store never calls out while holding the
//! entries lock.
//!
//! ## Delivery
//! Each key has a reentrant delivery lock held across the listener loop, and
//! each listener remembers the last version it was handed. Emits racing on
//! different threads are therefore delivered one at a time, and a listener
//! skips any snapshot not newer than the one it already has.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use jd_core::transform::merge_page;
use jd_core::{CollectionItem, CollectionSnapshot, FetchedPage, JobId, MutationId, QueryKey};

/// Callback invoked with every new snapshot of a key.
pub type SnapshotListener<T> = dyn Fn(&CollectionSnapshot<T>) + Send + Sync;

type ListenerId = u64;

struct Listener<T> {
    id: ListenerId,
    callback: Arc<SnapshotListener<T>>,
    last_seen: AtomicU64,
}

impl<T> Listener<T> {
    /// Hand `snapshot` over unless this listener already saw it or a newer one.
    /// Callers hold the key's delivery lock.
    fn deliver(&self, snapshot: &CollectionSnapshot<T>) -> bool {
        if snapshot.version <= self.last_seen.load(Ordering::Acquire) {
            return false;
        }
        self.last_seen.store(snapshot.version, Ordering::Release);
        (self.callback)(snapshot);
        true
    }
}

/// Result of handing a fetched page to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome<T> {
    /// First data for the key.
    Created(CollectionSnapshot<T>),
    /// The page differed and replaced the snapshot wholesale.
    Replaced(CollectionSnapshot<T>),
    /// The page matched what was cached; nothing changed.
    Unchanged,
    /// Optimistic mutations are in flight; the page waits for them to reconcile.
    Held,
}

struct CacheEntry<T> {
    snapshot: Option<CollectionSnapshot<T>>,
    /// Targets of optimistic mutations applied to this key and not yet reconciled.
    in_flight: HashMap<MutationId, Vec<JobId>>,
    held: Option<FetchedPage<T>>,
    listeners: Vec<Arc<Listener<T>>>,
    delivery: Arc<ReentrantMutex<()>>,
}

impl<T> CacheEntry<T> {
    fn new() -> Self {
        Self {
            snapshot: None,
            in_flight: HashMap::new(),
            held: None,
            listeners: Vec::new(),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }
}

pub struct CollectionStore<T> {
    entries: Mutex<HashMap<QueryKey, CacheEntry<T>>>,
    next_listener_id: AtomicU64,
}

/// Handle returned by [`CollectionStore::subscribe`].
///
/// Dropping the handle unsubscribes.
pub struct Subscription<T: CollectionItem> {
    store: Weak<CollectionStore<T>>,
    key: QueryKey,
    id: ListenerId,
    first: bool,
}

impl<T: CollectionItem> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Whether this subscription moved the key's subscriber count from 0 to 1.
    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl<T: CollectionItem> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(&self.key, self.id);
        }
    }
}

impl<T: CollectionItem> CollectionStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CollectionSnapshot<T>> {
        self.entries
            .lock()
            .get(key)
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Register `listener` for `key`.
    ///
    /// If the key already has a snapshot the listener is called with it right
    /// away, before this returns.
    pub fn subscribe(
        self: &Arc<Self>,
        key: &QueryKey,
        listener: impl Fn(&CollectionSnapshot<T>) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener {
            id,
            callback: Arc::new(listener) as Arc<SnapshotListener<T>>,
            last_seen: AtomicU64::new(0),
        });

        let delivery = self.delivery_lock(key);
        let _delivering = delivery.lock();

        let (first, current) = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
            entry.listeners.push(Arc::clone(&listener));
            (entry.listeners.len() == 1, entry.snapshot.clone())
        };

        debug!(key = %key, listener_id = id, first, "subscribed");
        if let Some(snapshot) = current {
            listener.deliver(&snapshot);
        }

        Subscription {
            store: Arc::downgrade(self),
            key: key.clone(),
            id,
            first,
        }
    }

    fn delivery_lock(&self, key: &QueryKey) -> Arc<ReentrantMutex<()>> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        Arc::clone(&entry.delivery)
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.entries
            .lock()
            .get(key)
            .map(|entry| entry.listeners.len())
            .unwrap_or(0)
    }

    /// Keys that currently have at least one subscriber.
    pub fn active_keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.listeners.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether optimistic mutations are currently applied to `key`.
    pub fn has_in_flight(&self, key: &QueryKey) -> bool {
        self.entries
            .lock()
            .get(key)
            .map(|entry| !entry.in_flight.is_empty())
            .unwrap_or(false)
    }

    fn remove_listener(&self, key: &QueryKey, id: ListenerId) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.listeners.retain(|listener| listener.id != id);
            debug!(key = %key, listener_id = id, remaining = entry.listeners.len(), "unsubscribed");
        }
    }

    /// Notify subscribers of `snapshot`.
    ///
    /// Listeners that already saw this version or a newer one are skipped, so
    /// no subscriber ever sees the version go backwards.
    pub(crate) fn emit(&self, snapshot: &CollectionSnapshot<T>) {
        let delivery = match self.entries.lock().get(&snapshot.key) {
            Some(entry) => Arc::clone(&entry.delivery),
            None => return,
        };
        let _delivering = delivery.lock();

        let listeners: Vec<Arc<Listener<T>>> = match self.entries.lock().get(&snapshot.key) {
            Some(entry) => entry.listeners.clone(),
            None => return,
        };

        let delivered = listeners
            .iter()
            .filter(|listener| listener.deliver(snapshot))
            .count();
        if delivered < listeners.len() {
            trace!(
                key = %snapshot.key,
                version = snapshot.version,
                skipped = listeners.len() - delivered,
                "skipped listeners already past this version"
            );
        }
    }

    /// Register an optimistic mutation on `key` and publish its candidate.
    ///
    /// `transform` receives the current snapshot; the returned pair is
    /// `(rollback, candidate)`. Without a cached snapshot nothing is published
    /// but the mutation is still registered, so fetched pages are held until it
    /// reconciles.
    pub(crate) fn begin_optimistic<F>(
        &self,
        key: &QueryKey,
        mutation_id: MutationId,
        targets: &[JobId],
        transform: F,
    ) -> Option<(CollectionSnapshot<T>, CollectionSnapshot<T>)>
    where
        F: FnOnce(&CollectionSnapshot<T>) -> CollectionSnapshot<T>,
    {
        let applied = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
            entry.in_flight.insert(mutation_id, targets.to_vec());
            match entry.snapshot.as_ref() {
                Some(current) => {
                    let rollback = current.clone();
                    let candidate = transform(current);
                    entry.snapshot = Some(candidate.clone());
                    Some((rollback, candidate))
                }
                None => None,
            }
        };

        if let Some((_, candidate)) = &applied {
            self.emit(candidate);
        }
        applied
    }

    /// Reconcile an optimistic mutation and publish the result.
    ///
    /// `reconcile` gets the current snapshot and whether other optimistic
    /// mutations remain on the key. A page held back while mutations were in
    /// flight is then merged item by item, keeping the local state of this
    /// mutation's targets and of every still-pending target.
    ///
    /// Returns `None` without touching the entry when `mutation_id` is not
    /// registered on `key`.
    pub(crate) fn finish_optimistic<F>(
        &self,
        key: &QueryKey,
        mutation_id: MutationId,
        reconcile: F,
    ) -> Option<CollectionSnapshot<T>>
    where
        F: FnOnce(&CollectionSnapshot<T>, bool) -> CollectionSnapshot<T>,
    {
        let published = {
            let mut entries = self.entries.lock();
            let entry = entries.get_mut(key)?;
            // Already reconciled, or never registered.
            let own_targets = entry.in_flight.remove(&mutation_id)?;
            let still_dirty = !entry.in_flight.is_empty();

            let reconciled = entry
                .snapshot
                .as_ref()
                .map(|current| reconcile(current, still_dirty));

            let next = match (reconciled, entry.held.take()) {
                (Some(reconciled), Some(held)) => {
                    let mut protected: HashSet<JobId> = own_targets.into_iter().collect();
                    for targets in entry.in_flight.values() {
                        protected.extend(targets.iter().cloned());
                    }
                    let merged = merge_page(&reconciled, &held, &protected);
                    debug!(key = %key, protected = protected.len(), "merged held page");
                    Some(CollectionSnapshot {
                        key: key.clone(),
                        items: merged.items,
                        total_count: merged.total_count,
                        version: reconciled.version,
                        dirty: still_dirty,
                    })
                }
                (Some(reconciled), None) => Some(reconciled),
                (None, Some(held)) if !still_dirty => {
                    Some(CollectionSnapshot::from_page(key.clone(), held))
                }
                (None, Some(held)) => {
                    entry.held = Some(held);
                    None
                }
                (None, None) => None,
            };

            if let Some(snapshot) = &next {
                entry.snapshot = Some(snapshot.clone());
            }
            next
        };

        if let Some(snapshot) = &published {
            self.emit(snapshot);
        }
        published
    }

    /// Store a fetched page without notifying subscribers.
    ///
    /// Replaces the snapshot wholesale when no optimistic mutation is applied
    /// to the key; otherwise the page is held (latest wins) for
    /// [`finish_optimistic`](Self::finish_optimistic). Identical content leaves
    /// the snapshot and its version alone. The caller emits the returned
    /// snapshot once its own locks are released.
    pub(crate) fn apply_fetched(&self, key: &QueryKey, page: FetchedPage<T>) -> ApplyOutcome<T> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

        if !entry.in_flight.is_empty() {
            entry.held = Some(page);
            return ApplyOutcome::Held;
        }

        match entry.snapshot.as_ref() {
            None => {
                let created = CollectionSnapshot::from_page(key.clone(), page);
                entry.snapshot = Some(created.clone());
                ApplyOutcome::Created(created)
            }
            Some(current) if current.same_content_as_page(&page) => ApplyOutcome::Unchanged,
            Some(current) => {
                let replaced = CollectionSnapshot {
                    key: key.clone(),
                    items: page.items,
                    total_count: page.total_count,
                    version: current.version + 1,
                    dirty: false,
                };
                entry.snapshot = Some(replaced.clone());
                ApplyOutcome::Replaced(replaced)
            }
        }
    }

    /// Seed or overwrite a snapshot directly and notify subscribers.
    ///
    /// The stored version is raised above the current one when needed, so the
    /// new content always reaches subscribers. Returns what was stored.
    pub(crate) fn publish(&self, mut snapshot: CollectionSnapshot<T>) -> CollectionSnapshot<T> {
        {
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(snapshot.key.clone())
                .or_insert_with(CacheEntry::new);
            if let Some(current) = &entry.snapshot {
                snapshot.version = snapshot.version.max(current.version + 1);
            }
            entry.snapshot = Some(snapshot.clone());
        }
        self.emit(&snapshot);
        snapshot
    }
}

impl<T: CollectionItem> Default for CollectionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
