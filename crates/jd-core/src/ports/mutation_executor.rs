use async_trait::async_trait;

use crate::ids::JobId;
use crate::mutation::{ExecutorResponse, MutationOp};
use crate::ports::TransportError;

/// Performs the remote call for one mutation.
///
/// `Ok` means the server answered, even if it rejected every item; `Err` means
/// no verdict was obtained. Implementations must not retry on their own.
#[async_trait]
pub trait MutationExecutorPort: Send + Sync {
    async fn run(
        &self,
        op: &MutationOp,
        target_ids: &[JobId],
    ) -> Result<ExecutorResponse, TransportError>;
}
