mod scheduler;

pub use scheduler::{RevalidationReport, RevalidationScheduler};
