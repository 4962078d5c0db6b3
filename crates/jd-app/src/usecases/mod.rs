//! Use cases that write to the collection store.
//!
//! Mutations go through the coordinator; server refreshes go through the
//! scheduler. Nothing else writes snapshots.

pub mod mutation;
pub mod revalidation;

pub use mutation::MutationCoordinator;
pub use revalidation::{RevalidationReport, RevalidationScheduler};
