//! Metric collection from domain sources.
//!
//! - [`source`] — the [`MetricSource`] fetch seam and its HTTP implementation
//! - [`domain`] — single-domain collection with timeout, retry, and
//!   validation
//! - [`orchestrator`] — concurrent fan-out across domains under one round
//!   deadline

pub mod domain;
pub mod orchestrator;
pub mod source;

pub use domain::{collect_domain, CollectOptions, CollectedBatch};
pub use orchestrator::{collect_all, OrchestratorConfig, MAX_CONCURRENT_COLLECTORS};
pub use source::{HttpMetricSource, MetricSource, SourceError};
