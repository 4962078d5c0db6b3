//! JobDesk
//!
//! 任务列表缓存：乐观批量变更与后台重新验证

pub mod bootstrap;
pub mod cli;

pub use bootstrap::wiring::{wire_in_memory, WiredCache};
