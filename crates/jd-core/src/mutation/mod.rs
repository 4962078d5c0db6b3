//! Mutation descriptors, server results and reconciled outcomes.

mod op;
mod outcome;
mod pending;
mod result;

pub use op::{ExportFormat, MutationKind, MutationOp};
pub use outcome::{MutationOutcome, Resolution};
pub use pending::PendingMutation;
pub use result::{BatchResult, ExecutorResponse, ItemFailure, SingleResult};

/// Error codes synthesised locally. Codes returned by the server are passed
/// through untouched.
pub mod error_codes {
    /// The server dropped the id from its response.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// The executor did not settle within the mutation timeout.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Connection dropped or the request could not be delivered.
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    /// The reconciliation task itself failed.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
