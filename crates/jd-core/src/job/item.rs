use crate::ids::JobId;
use crate::job::{Assignee, JobStatus};

/// An element of a cached remote collection.
///
/// The transform engine only ever needs the identity of an item and the two
/// field-level edits performed by bulk operations; everything else about the
/// item is opaque to the cache.
pub trait CollectionItem: Clone + PartialEq + Send + Sync + 'static {
    fn item_id(&self) -> &JobId;

    fn set_status(&mut self, status: &JobStatus);

    /// Replace the assignment fields. `None` clears the assignment.
    fn set_assignee(&mut self, assignee: Option<&Assignee>);
}
