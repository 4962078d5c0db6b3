//! Revalidation policy: when a cached collection should be refetched.

mod policy;
mod trigger;

pub use policy::{FetchTimeline, RevalidationDecision, RevalidationPolicy};
pub use trigger::RevalidationTrigger;
