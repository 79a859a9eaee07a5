//! Postgres-backed implementation of the engine's store traits.

use metrion_core::decision::OptimizationDecision;
use metrion_core::error::StoreError;
use metrion_core::metric::MetricRecord;
use metrion_core::store::{AppendOutcome, DecisionStore, MetricHistoryStore};

use crate::models::telemetry::CreateMetricHistory;
use crate::repositories::{DecisionRepo, MetricHistoryRepo};
use crate::DbPool;

/// Durable store handle shared by the engine and background tasks.
///
/// Cheap to clone; the underlying pool is reference-counted.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    pool: DbPool,
}

impl TelemetryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl MetricHistoryStore for TelemetryStore {
    async fn append_metric_history(&self, records: &[MetricRecord]) -> Result<(), StoreError> {
        let rows: Vec<CreateMetricHistory> =
            records.iter().map(CreateMetricHistory::from).collect();
        MetricHistoryRepo::insert_batch(&self.pool, &rows)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}

impl DecisionStore for TelemetryStore {
    async fn append_decision(
        &self,
        decision: &OptimizationDecision,
    ) -> Result<AppendOutcome, StoreError> {
        let inserted = DecisionRepo::insert(&self.pool, decision)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        if inserted {
            Ok(AppendOutcome::Appended)
        } else {
            // The unique index caught a duplicate that slipped past the
            // sink's in-memory window (restart or overlapping round).
            tracing::debug!(
                dedup_key = %decision.dedup_key,
                "Decision already stored, skipping"
            );
            Ok(AppendOutcome::AlreadyExists)
        }
    }
}
