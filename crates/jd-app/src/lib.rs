//! JobDesk cache orchestration layer
//!
//! This crate owns the cached job collections and everything that writes to
//! them: the mutation coordinator, the revalidation scheduler and the
//! selection tracker, wired together behind [`JobListCache`].

pub mod deps;
pub mod runtime;
pub mod selection;
pub mod store;
pub mod usecases;

pub use deps::CacheDeps;
pub use runtime::JobListCache;
pub use selection::SelectionTracker;
pub use store::{ApplyOutcome, CollectionStore, Subscription};
pub use usecases::{MutationCoordinator, RevalidationReport, RevalidationScheduler};
