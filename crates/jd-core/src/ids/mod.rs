//! ID type wrappers for type safety.

mod id_macro;
pub mod job_id;
pub mod mutation_id;

pub use job_id::{JobId, UserId};
pub use mutation_id::MutationId;
