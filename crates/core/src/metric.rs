//! Metric records and the validation boundary.
//!
//! Domain sources hand back loosely-shaped JSON; [`validate`] is the single
//! gate through which an observation becomes an immutable [`MetricRecord`].
//! A record that fails any constraint is rejected with a typed
//! [`ValidationError`] and never reaches the evaluator — it is dropped and
//! counted by the caller, not coerced.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Timestamp;

/// Closed enumeration of metric kinds accepted from domain sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Normalized ratio in `[0, 1]`; higher means closer to saturation.
    Performance,
    /// Resource utilization ratio; higher is worse.
    Resource,
    /// Observed latency in milliseconds.
    Latency,
    /// Raw throughput figure; collected but currently never evaluated.
    Throughput,
}

impl MetricType {
    /// All members of the closed enumeration.
    pub const ALL: [MetricType; 4] = [
        MetricType::Performance,
        MetricType::Resource,
        MetricType::Latency,
        MetricType::Throughput,
    ];

    /// Canonical lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Performance => "performance",
            MetricType::Resource => "resource",
            MetricType::Latency => "latency",
            MetricType::Throughput => "throughput",
        }
    }

    /// Parse a wire name. Returns `None` for anything outside the
    /// enumeration — the caller decides how to report it.
    pub fn parse(name: &str) -> Option<MetricType> {
        MetricType::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped observation as received from a domain source.
///
/// Every field is optional because sources may omit or garble any of them;
/// unknown extra fields in the payload are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetricRecord {
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// One validated observation. Constructed only by [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub domain_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub timestamp: Timestamp,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Validate and normalize one raw observation.
///
/// `collected_at` is the caller's clock reading for this collection pass;
/// it fills `timestamp` when the source omitted one. Pure: no I/O, and
/// deterministic given identical input and clock reading.
///
/// Rules:
/// - `domain_id` and `metric_type` must be present and non-empty.
/// - `metric_type` must be one of the closed enumeration.
/// - `value` must be present, finite, and `>= 0`; performance values must
///   additionally be `<= 1.0` (exactly `1.0` is accepted).
pub fn validate(
    raw: RawMetricRecord,
    collected_at: Timestamp,
) -> Result<MetricRecord, ValidationError> {
    let domain_id = match raw.domain_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ValidationError::MissingField("domain_id")),
    };

    let type_name = match raw.metric_type {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ValidationError::MissingField("metric_type")),
    };
    let metric_type = MetricType::parse(&type_name)
        .ok_or(ValidationError::UnknownMetricType(type_name))?;

    let value = raw
        .value
        .ok_or(ValidationError::MissingField("value"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::OutOfRange { metric_type, value });
    }
    if metric_type == MetricType::Performance && value > 1.0 {
        return Err(ValidationError::OutOfRange { metric_type, value });
    }

    Ok(MetricRecord {
        domain_id,
        metric_type,
        value,
        timestamp: raw.timestamp.unwrap_or(collected_at),
        metadata: raw.metadata.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
