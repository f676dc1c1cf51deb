//! Game simulation modules

pub mod ai;
pub mod entity;
pub mod grid;
pub mod manager;
pub mod r#match;
pub mod pathing;
pub mod tuning;

pub use manager::{MatchManager, MatchSummary};
pub use r#match::GameMatch;
