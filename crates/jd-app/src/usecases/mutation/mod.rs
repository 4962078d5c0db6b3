//! Optimistic mutations: publish first, reconcile when the server answers.

mod coordinator;
mod single_flight;

pub use coordinator::MutationCoordinator;
