//! Telemetry entity models and DTOs.
//!
//! Models for the append-only metric history and the deduplicated
//! optimization decision log.

use metrion_core::metric::MetricRecord;
use metrion_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Metric history (append-only)
// ---------------------------------------------------------------------------

/// A single validated observation persisted for one domain.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MetricHistoryRow {
    pub id: DbId,
    pub domain_id: String,
    pub metric_type: String,
    pub value: f64,
    pub recorded_at: Timestamp,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for inserting a metric history row.
#[derive(Debug, Clone)]
pub struct CreateMetricHistory {
    pub domain_id: String,
    pub metric_type: String,
    pub value: f64,
    pub recorded_at: Timestamp,
    pub metadata: serde_json::Value,
}

impl From<&MetricRecord> for CreateMetricHistory {
    fn from(record: &MetricRecord) -> Self {
        Self {
            domain_id: record.domain_id.clone(),
            metric_type: record.metric_type.as_str().to_string(),
            value: record.value,
            recorded_at: record.timestamp,
            metadata: serde_json::Value::Object(record.metadata.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Optimization decisions
// ---------------------------------------------------------------------------

/// A stored optimization decision, unique per dedup key.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DecisionRow {
    pub id: DbId,
    pub domain_id: String,
    pub trigger_metric_type: String,
    pub observed_value: f64,
    pub threshold_value: f64,
    pub severity: f64,
    pub dedup_key: String,
    pub triggered_at: Timestamp,
    pub created_at: Timestamp,
}
