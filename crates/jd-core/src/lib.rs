//! # jd-core
//!
//! Core domain models and cache-consistency logic for JobDesk.
//!
//! This crate contains pure business logic without any infrastructure dependencies:
//! the collection snapshot model, the optimistic transform engine, result
//! normalisation, revalidation policy and the ports the application layer drives.

pub mod config;
pub mod ids;
pub mod job;
pub mod mutation;
pub mod ports;
pub mod query;
pub mod revalidation;
pub mod selection;
pub mod snapshot;
pub mod transform;

// Re-export commonly used types at the crate root
pub use config::{AppConfig, CacheConfig, ConfigError, LoggingConfig};
pub use ids::{JobId, MutationId, UserId};
pub use job::{Assignee, CollectionItem, Job, JobStatus};
pub use mutation::{
    BatchResult, ExecutorResponse, ExportFormat, ItemFailure, MutationKind, MutationOp,
    MutationOutcome, PendingMutation, Resolution, SingleResult,
};
pub use query::{JobQuery, QueryKey, QueryKeyError};
pub use revalidation::{RevalidationDecision, RevalidationPolicy, RevalidationTrigger};
pub use selection::SelectionSet;
pub use snapshot::{CollectionSnapshot, FetchedPage};
