//! metrion domain logic.
//!
//! Pure types and functions shared by every other crate in the workspace:
//!
//! - [`metric`] — the closed metric-type enumeration, raw source records,
//!   and the validation boundary that produces immutable [`MetricRecord`]s.
//! - [`thresholds`] — the immutable per-run [`ThresholdConfig`].
//! - [`evaluator`] — the stateful breach detector that turns validated
//!   metric streams into edge-triggered [`OptimizationDecision`]s.
//! - [`decision`] — the decision event and its deterministic dedup key.
//! - [`backoff`] — the exponential-backoff policy shared by collection
//!   retries and decision delivery.
//! - [`store`] — async traits for the external durable store.
//! - [`error`] — the typed error families for every recovery boundary.
//!
//! Nothing in this crate performs I/O; callers supply clock readings and
//! store handles explicitly.

pub mod backoff;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod metric;
pub mod store;
pub mod thresholds;
pub mod types;

pub use backoff::{next_delay, BackoffConfig};
pub use decision::OptimizationDecision;
pub use error::{CollectionError, ConfigError, SinkError, StoreError, ValidationError};
pub use evaluator::ThresholdEvaluator;
pub use metric::{validate, MetricRecord, MetricType, RawMetricRecord};
pub use store::{AppendOutcome, DecisionStore, MetricHistoryStore};
pub use thresholds::ThresholdConfig;
