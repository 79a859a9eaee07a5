//! Threshold evaluation engine for collected metrics.
//!
//! Pure logic — no database access. The caller is responsible for collecting
//! records and passing them in together with the active [`ThresholdConfig`].
//!
//! Breach detection is edge-triggered: each `(domain, metric type)` pair is
//! either nominal or breached, and a decision is emitted only on the
//! nominal→breached transition. Further breaching observations keep the pair
//! breached silently; an observation at or below the threshold clears it and
//! re-arms detection. This keeps a sustained breach from emitting a decision
//! on every round.

use std::collections::HashMap;

use crate::decision::OptimizationDecision;
use crate::metric::{MetricRecord, MetricType};
use crate::thresholds::ThresholdConfig;
use crate::types::Timestamp;

/// Composite key for breach tracking: (domain_id, metric_type).
type PairKey = (String, MetricType);

/// Tracked state for one `(domain, metric type)` pair.
#[derive(Debug, Default)]
struct PairState {
    last_value: Option<f64>,
    breached: bool,
    last_decision_at: Option<Timestamp>,
}

/// Edge-triggered breach detector across all domains and metric types.
///
/// State is keyed under the domain a batch was collected from, not the
/// per-record field, so one source cannot move another domain's pairs.
/// `&mut self` on [`evaluate`](Self::evaluate) keeps evaluation single-writer;
/// rounds are sequential from the caller's side.
#[derive(Debug, Default)]
pub struct ThresholdEvaluator {
    state: HashMap<PairKey, PairState>,
}

impl ThresholdEvaluator {
    /// Create a new evaluator with every pair nominal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one domain's records in order and return the decisions the
    /// batch triggered.
    ///
    /// Records whose metric type has no threshold (throughput) are skipped.
    /// Every evaluated record updates its pair's state, so ordering within
    /// the batch matters: `[80, 120, 130, 90]` against a threshold of 100
    /// yields exactly one decision, for the observation at 120.
    pub fn evaluate(
        &mut self,
        domain_id: &str,
        records: &[MetricRecord],
        config: &ThresholdConfig,
    ) -> Vec<OptimizationDecision> {
        let mut decisions = Vec::new();

        for record in records {
            let Some(threshold) = config.threshold_for(record.metric_type) else {
                continue;
            };

            let state = self
                .state
                .entry((domain_id.to_string(), record.metric_type))
                .or_default();
            let breaching = record.value > threshold;

            if breaching && !state.breached {
                decisions.push(OptimizationDecision::new(
                    domain_id,
                    record.metric_type,
                    record.value,
                    threshold,
                    record.timestamp,
                ));
                state.last_decision_at = Some(record.timestamp);
            }

            state.breached = breaching;
            state.last_value = Some(record.value);
        }

        decisions
    }

    /// Whether a pair is currently in the breached state.
    pub fn is_breached(&self, domain_id: &str, metric_type: MetricType) -> bool {
        self.state
            .get(&(domain_id.to_string(), metric_type))
            .map(|s| s.breached)
            .unwrap_or(false)
    }

    /// Most recent evaluated value for a pair, if any.
    pub fn last_observed(&self, domain_id: &str, metric_type: MetricType) -> Option<f64> {
        self.state
            .get(&(domain_id.to_string(), metric_type))
            .and_then(|s| s.last_value)
    }

    /// When the pair last triggered a decision, if ever.
    pub fn last_decision_at(
        &self,
        domain_id: &str,
        metric_type: MetricType,
    ) -> Option<Timestamp> {
        self.state
            .get(&(domain_id.to_string(), metric_type))
            .and_then(|s| s.last_decision_at)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
