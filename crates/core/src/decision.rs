//! Optimization decisions emitted on threshold breach transitions.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::metric::MetricType;
use crate::types::Timestamp;

/// A single optimization trigger, created by the evaluator when a
/// `(domain, metric)` pair transitions from nominal to breached.
///
/// Decisions are immutable after construction and consumed exactly once by
/// the decision sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationDecision {
    pub domain_id: String,
    pub trigger_metric_type: MetricType,
    pub observed_value: f64,
    pub threshold_value: f64,
    /// Relative overshoot: `(observed - threshold) / threshold`, clamped ≥ 0.
    pub severity: f64,
    /// Timestamp of the observation that started the breach.
    pub created_at: Timestamp,
    /// Stable identity for deduplication, derived from the breach start.
    pub dedup_key: String,
}

impl OptimizationDecision {
    /// Build a decision for a breach that started at `created_at`.
    ///
    /// The dedup key hashes `domain|metric|breach-start`, so two rounds that
    /// observe the same transition derive the same key and collapse to one
    /// stored decision.
    pub fn new(
        domain_id: impl Into<String>,
        trigger_metric_type: MetricType,
        observed_value: f64,
        threshold_value: f64,
        created_at: Timestamp,
    ) -> Self {
        let domain_id = domain_id.into();
        let severity = ((observed_value - threshold_value) / threshold_value).max(0.0);
        let dedup_key = sha256_hex(
            format!(
                "{domain_id}|{trigger_metric_type}|{}",
                created_at.to_rfc3339()
            )
            .as_bytes(),
        );
        Self {
            domain_id,
            trigger_metric_type,
            observed_value,
            threshold_value,
            severity,
            created_at,
            dedup_key,
        }
    }
}

/// Compute a SHA-256 hex digest of the given bytes.
fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn severity_is_relative_overshoot() {
        let decision =
            OptimizationDecision::new("d1", MetricType::Latency, 120.0, 100.0, Utc::now());
        assert!((decision.severity - 0.2).abs() < 1e-9);
    }

    #[test]
    fn severity_clamped_to_zero() {
        let decision =
            OptimizationDecision::new("d1", MetricType::Resource, 0.5, 0.8, Utc::now());
        assert_eq!(decision.severity, 0.0);
    }

    #[test]
    fn dedup_key_is_deterministic() {
        let ts = Utc::now();
        let a = OptimizationDecision::new("d1", MetricType::Latency, 120.0, 100.0, ts);
        let b = OptimizationDecision::new("d1", MetricType::Latency, 130.0, 100.0, ts);
        // Same breach start, different observed values: same identity.
        assert_eq!(a.dedup_key, b.dedup_key);
    }

    #[test]
    fn dedup_key_varies_by_domain_metric_and_start() {
        let ts = Utc::now();
        let base = OptimizationDecision::new("d1", MetricType::Latency, 120.0, 100.0, ts);
        let other_domain =
            OptimizationDecision::new("d2", MetricType::Latency, 120.0, 100.0, ts);
        let other_metric =
            OptimizationDecision::new("d1", MetricType::Resource, 0.9, 0.8, ts);
        let other_start = OptimizationDecision::new(
            "d1",
            MetricType::Latency,
            120.0,
            100.0,
            ts + chrono::Duration::seconds(1),
        );
        assert_ne!(base.dedup_key, other_domain.dedup_key);
        assert_ne!(base.dedup_key, other_metric.dedup_key);
        assert_ne!(base.dedup_key, other_start.dedup_key);
    }

    #[test]
    fn dedup_key_is_hex_digest() {
        let decision =
            OptimizationDecision::new("d1", MetricType::Performance, 0.9, 0.7, Utc::now());
        assert_eq!(decision.dedup_key.len(), 64);
        assert!(decision.dedup_key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
