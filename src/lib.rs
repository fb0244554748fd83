//! supersplit - Weekly superset program planner
//!
//! Picks weekly exercise volumes that best cover per-muscle set targets,
//! pairs them into low-overlap supersets and spreads those over training days.

pub mod catalog;
pub mod db;
pub mod error;
pub mod model;
pub mod plan;
pub mod report;
pub mod tui;

pub use catalog::Catalog;
pub use db::Database;
pub use error::ConfigError;
pub use model::{Outcome, Planner, SolveStatus};
pub use plan::Plan;
