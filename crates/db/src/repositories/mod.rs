//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod decision_repo;
pub mod metric_history_repo;

pub use decision_repo::DecisionRepo;
pub use metric_history_repo::MetricHistoryRepo;
