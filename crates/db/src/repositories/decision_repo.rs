//! Repository for the `optimization_decisions` table.

use metrion_core::decision::OptimizationDecision;
use metrion_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::telemetry::DecisionRow;

/// Column list for `optimization_decisions` SELECT queries.
const COLUMNS: &str = "\
    id, domain_id, trigger_metric_type, observed_value, threshold_value, \
    severity, dedup_key, triggered_at, created_at";

/// Column list for `optimization_decisions` INSERT statements.
const INSERT_COLUMNS: &str = "\
    domain_id, trigger_metric_type, observed_value, threshold_value, \
    severity, dedup_key, triggered_at";

/// Provides query operations for optimization decisions.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Insert a decision, idempotent on its dedup key.
    ///
    /// Returns `true` if a new row was written, `false` if a decision with
    /// the same dedup key already existed.
    pub async fn insert(
        pool: &PgPool,
        decision: &OptimizationDecision,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "INSERT INTO optimization_decisions ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (dedup_key) DO NOTHING"
        );
        let result = sqlx::query(&query)
            .bind(&decision.domain_id)
            .bind(decision.trigger_metric_type.as_str())
            .bind(decision.observed_value)
            .bind(decision.threshold_value)
            .bind(decision.severity)
            .bind(&decision.dedup_key)
            .bind(decision.created_at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Look up a decision by its dedup key.
    pub async fn get_by_dedup_key(
        pool: &PgPool,
        dedup_key: &str,
    ) -> Result<Option<DecisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM optimization_decisions WHERE dedup_key = $1"
        );
        sqlx::query_as::<_, DecisionRow>(&query)
            .bind(dedup_key)
            .fetch_optional(pool)
            .await
    }

    /// Get decisions triggered since a cutoff, newest first.
    pub async fn list_since(
        pool: &PgPool,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<DecisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM optimization_decisions \
             WHERE triggered_at >= $1 \
             ORDER BY triggered_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DecisionRow>(&query)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
