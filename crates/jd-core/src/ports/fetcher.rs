use async_trait::async_trait;

use crate::job::CollectionItem;
use crate::ports::FetchError;
use crate::query::QueryKey;
use crate::snapshot::FetchedPage;

/// Source of truth for a list query.
#[async_trait]
pub trait FetcherPort<T: CollectionItem>: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<FetchedPage<T>, FetchError>;
}
