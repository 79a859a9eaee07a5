//! Typed error families, one per recovery boundary.
//!
//! Each family is recovered at a different layer: [`ValidationError`] per
//! record, [`CollectionError`] per domain, [`SinkError`] per decision,
//! [`StoreError`] per store call, and [`ConfigError`] is startup-fatal.

use std::time::Duration;

use crate::metric::MetricType;

/// A raw metric record failed validation and was rejected at the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// `metric_type` was present but not one of the closed enumeration.
    #[error("Unknown metric type: {0:?}")]
    UnknownMetricType(String),

    /// `value` violated the bounds for its metric type.
    #[error("Value {value} out of range for {metric_type} metric")]
    OutOfRange { metric_type: MetricType, value: f64 },
}

/// Collecting one domain's metrics failed; other domains are unaffected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectionError {
    /// Every fetch attempt failed (or a permanent source error occurred).
    #[error("Domain unreachable after {attempts} attempt(s): {last_error}")]
    DomainUnreachable { attempts: u32, last_error: String },

    /// The collection-round deadline elapsed before this domain finished.
    #[error("Collection round deadline ({0:?}) elapsed")]
    Timeout(Duration),
}

/// Forwarding a decision to the durable store failed after retries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    /// The decision was dropped after exhausting delivery attempts.
    #[error("Decision delivery failed after {attempts} attempt(s): {last_error}")]
    DeliveryFailed { attempts: u32, last_error: String },
}

/// Startup configuration failure. Fatal: the system must not run with
/// partial or invalid thresholds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A required credential or connection setting was not provided.
    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),

    /// A provided value could not be parsed or violates its bounds.
    #[error("Invalid configuration value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Opaque failure from the external durable store.
///
/// The db crate converts its driver errors into this; core-level callers
/// only ever log or count it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Durable store error: {0}")]
pub struct StoreError(pub String);
