//! Repository for the `metric_history` table (append-only time-series).

use metrion_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::telemetry::{CreateMetricHistory, MetricHistoryRow};

/// Column list for `metric_history` SELECT queries (includes `id` and `created_at`).
const COLUMNS: &str = "\
    id, domain_id, metric_type, value, recorded_at, metadata, created_at";

/// Column list for `metric_history` INSERT statements (excludes auto-generated columns).
const INSERT_COLUMNS: &str = "domain_id, metric_type, value, recorded_at, metadata";

/// Provides query operations for metric history.
pub struct MetricHistoryRepo;

impl MetricHistoryRepo {
    /// Insert a single observation.
    pub async fn insert(
        pool: &PgPool,
        row: &CreateMetricHistory,
    ) -> Result<MetricHistoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO metric_history ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MetricHistoryRow>(&query)
            .bind(&row.domain_id)
            .bind(&row.metric_type)
            .bind(row.value)
            .bind(row.recorded_at)
            .bind(&row.metadata)
            .fetch_one(pool)
            .await
    }

    /// Batch-insert one collection round's observations for a domain.
    ///
    /// Uses a single multi-row INSERT for efficiency.
    pub async fn insert_batch(
        pool: &PgPool,
        rows: &[CreateMetricHistory],
    ) -> Result<(), sqlx::Error> {
        if rows.is_empty() {
            return Ok(());
        }

        // Build a multi-row VALUES clause.
        let mut query = format!("INSERT INTO metric_history ({INSERT_COLUMNS}) VALUES ");

        let mut param_idx = 1u32;
        for (i, _) in rows.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push('(');
            for j in 0..5 {
                if j > 0 {
                    query.push_str(", ");
                }
                query.push('$');
                query.push_str(&param_idx.to_string());
                param_idx += 1;
            }
            query.push(')');
        }

        let mut q = sqlx::query(&query);
        for row in rows {
            q = q
                .bind(&row.domain_id)
                .bind(&row.metric_type)
                .bind(row.value)
                .bind(row.recorded_at)
                .bind(&row.metadata);
        }

        q.execute(pool).await?;
        Ok(())
    }

    /// Get observations for a domain since a cutoff, newest first.
    pub async fn get_for_domain(
        pool: &PgPool,
        domain_id: &str,
        since: Timestamp,
    ) -> Result<Vec<MetricHistoryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metric_history \
             WHERE domain_id = $1 AND recorded_at >= $2 \
             ORDER BY recorded_at DESC"
        );
        sqlx::query_as::<_, MetricHistoryRow>(&query)
            .bind(domain_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Delete observations older than the given cutoff timestamp.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM metric_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
