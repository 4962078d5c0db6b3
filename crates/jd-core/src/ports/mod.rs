//! Port interfaces for the application layer
//!
//! Ports define the contract between the cache orchestration in `jd-app` and
//! whatever performs remote I/O. The transport that actually talks to the
//! backend is an adapter; the core only sees these traits.

mod clock;
pub mod errors;
mod fetcher;
mod lifecycle;
mod mutation_executor;

pub use clock::ClockPort;
pub use errors::{FetchError, TransportError};
pub use fetcher::FetcherPort;
pub use lifecycle::{LifecycleSignal, LifecycleSignalReceiver, LifecycleSignalSender};
pub use mutation_executor::MutationExecutorPort;
