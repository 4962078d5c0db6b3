//! Job (work item) domain model.

mod item;
mod model;

pub use item::CollectionItem;
pub use model::{Assignee, Job, JobStatus};
