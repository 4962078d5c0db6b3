//! JobDesk infrastructure adapters
//!
//! Concrete implementations of the ports declared in `jd-core`.

pub mod backend;
pub mod config;
pub mod time;

pub use backend::{load_fixture, InMemoryJobBackend};
pub use crate::config::load_app_config;
pub use time::SystemClock;
