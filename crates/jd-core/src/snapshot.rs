//! Versioned point-in-time materialisation of a remote list query.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;
use crate::job::CollectionItem;
use crate::query::QueryKey;

/// The cache entry for one query key.
///
/// Treated as immutable: every change produces a new snapshot with a higher
/// `version`. `items` keeps the server-returned order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot<T> {
    pub key: QueryKey,
    pub items: Vec<T>,
    pub total_count: u64,
    pub version: u64,
    pub dirty: bool,
}

/// One page as returned by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T: CollectionItem> CollectionSnapshot<T> {
    /// Snapshot created by the first fetch for a key.
    pub fn from_page(key: QueryKey, page: FetchedPage<T>) -> Self {
        Self {
            key,
            items: page.items,
            total_count: page.total_count,
            version: 1,
            dirty: false,
        }
    }

    pub fn position(&self, id: &JobId) -> Option<usize> {
        self.items.iter().position(|item| item.item_id() == id)
    }

    pub fn get(&self, id: &JobId) -> Option<&T> {
        self.items.iter().find(|item| item.item_id() == id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.items.iter().map(|item| item.item_id().clone()).collect()
    }

    /// Compares what subscribers can see (items and total), ignoring bookkeeping.
    pub fn same_content(&self, other: &Self) -> bool {
        self.total_count == other.total_count && self.items == other.items
    }

    pub fn same_content_as_page(&self, page: &FetchedPage<T>) -> bool {
        self.total_count == page.total_count && self.items == page.items
    }

    /// Copy of this snapshot carrying the given bookkeeping values.
    pub fn with_bookkeeping(mut self, version: u64, dirty: bool) -> Self {
        self.version = version;
        self.dirty = dirty;
        self
    }
}
