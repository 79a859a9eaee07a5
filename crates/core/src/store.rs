//! Durable store interfaces.
//!
//! Defines [`MetricHistoryStore`] and [`DecisionStore`], the seams between
//! the engine and whatever persistence backs it. The engine only ever sees
//! these traits; the Postgres implementation lives in its own crate and
//! tests substitute in-memory fakes.

use crate::decision::OptimizationDecision;
use crate::error::StoreError;
use crate::metric::MetricRecord;

/// Outcome of appending a decision to the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new decision row was written.
    Appended,
    /// A decision with the same dedup key already exists; nothing was
    /// written. Callers treat this as a duplicate, not a failure.
    AlreadyExists,
}

/// Append-only storage for validated metric observations.
pub trait MetricHistoryStore: Send + Sync {
    /// Append a batch of validated records. Batches are per domain and per
    /// round; an empty batch is a no-op.
    fn append_metric_history(
        &self,
        records: &[MetricRecord],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// Storage for optimization decisions, unique per dedup key.
pub trait DecisionStore: Send + Sync {
    /// Append one decision. A dedup-key conflict is not an error: the store
    /// reports [`AppendOutcome::AlreadyExists`] and leaves the existing row
    /// untouched.
    fn append_decision(
        &self,
        decision: &OptimizationDecision,
    ) -> impl std::future::Future<Output = Result<AppendOutcome, StoreError>> + Send;
}
