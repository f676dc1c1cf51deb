//! Shared utilities

pub mod rate_limit;
pub mod time;
