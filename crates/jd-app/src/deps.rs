//! # Cache Dependencies / 缓存依赖
//!
//! Parameter grouping for [`JobListCache`](crate::JobListCache) construction.
//! Not a builder: no defaults, no hidden steps.
//! 仅用于参数打包，无默认值。

use std::sync::Arc;

use jd_core::ports::{ClockPort, FetcherPort, MutationExecutorPort};
use jd_core::CacheConfig;

/// Everything the cache needs from the outside world.
/// 缓存所需的全部外部依赖。
pub struct CacheDeps<T> {
    // Remote collaborators / 远程协作者
    pub executor: Arc<dyn MutationExecutorPort>,
    pub fetcher: Arc<dyn FetcherPort<T>>,

    // System / 系统
    pub clock: Arc<dyn ClockPort>,
    pub config: CacheConfig,
}
