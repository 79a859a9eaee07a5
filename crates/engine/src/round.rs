//! One collection round, end to end.
//!
//! A round runs in strict phases: orchestrated collection across all
//! domains, then per-domain history persistence (best effort), evaluation,
//! and sink submission. Evaluation never begins while any domain is still
//! collecting — the orchestrator only returns once every domain has
//! finished or the round deadline has elapsed.
//!
//! `run_collection_round` takes `&mut self`, so overlapping rounds on one
//! engine are ruled out at compile time; the evaluator state is strictly
//! single-writer.

use std::collections::HashMap;

use chrono::Utc;
use metrion_collector::domain::CollectedBatch;
use metrion_collector::orchestrator::{collect_all, OrchestratorConfig};
use metrion_collector::source::MetricSource;
use metrion_core::decision::OptimizationDecision;
use metrion_core::error::CollectionError;
use metrion_core::evaluator::ThresholdEvaluator;
use metrion_core::store::{DecisionStore, MetricHistoryStore};
use metrion_core::thresholds::ThresholdConfig;
use metrion_core::types::Timestamp;
use uuid::Uuid;

use crate::sink::{Ack, DecisionSink, SinkConfig, SinkStats};

/// What happened to one domain during a round.
#[derive(Debug)]
pub enum DomainOutcome {
    /// Collection succeeded; counts of kept and dropped records.
    Collected { records: usize, invalid_dropped: u32 },
    /// Collection failed for this domain only.
    Failed(CollectionError),
}

/// Report for one completed round. A round always completes: partial
/// failure is recorded here, never thrown.
#[derive(Debug)]
pub struct RoundSummary {
    pub round_id: Uuid,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// One outcome per configured domain.
    pub domains: HashMap<String, DomainOutcome>,
    /// Every decision the evaluator emitted this round, in configured
    /// domain order.
    pub decisions: Vec<OptimizationDecision>,
    pub decisions_delivered: u64,
    pub decisions_deduplicated: u64,
    pub decisions_dropped: u64,
    pub history_append_failures: u32,
}

/// Drives collection rounds over a fixed domain set.
pub struct Engine<Src, St>
where
    Src: MetricSource,
    St: MetricHistoryStore + DecisionStore + Clone,
{
    source: Src,
    store: St,
    domains: Vec<String>,
    orchestrator: OrchestratorConfig,
    thresholds: ThresholdConfig,
    evaluator: ThresholdEvaluator,
    sink: DecisionSink<St>,
}

impl<Src, St> Engine<Src, St>
where
    Src: MetricSource,
    St: MetricHistoryStore + DecisionStore + Clone,
{
    pub fn new(
        source: Src,
        store: St,
        domains: Vec<String>,
        orchestrator: OrchestratorConfig,
        thresholds: ThresholdConfig,
        sink_config: SinkConfig,
    ) -> Self {
        let sink = DecisionSink::new(store.clone(), sink_config);
        Self {
            source,
            store,
            domains,
            orchestrator,
            thresholds,
            evaluator: ThresholdEvaluator::new(),
            sink,
        }
    }

    /// Cumulative sink counters across all rounds so far.
    pub fn sink_stats(&self) -> SinkStats {
        self.sink.stats()
    }

    /// Run one full collection round and report what happened.
    pub async fn run_collection_round(&mut self) -> RoundSummary {
        let round_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(%round_id, domains = self.domains.len(), "Starting collection round");

        let mut results = collect_all(&self.domains, &self.source, &self.orchestrator).await;

        let mut domains = HashMap::with_capacity(self.domains.len());
        let mut decisions = Vec::new();
        let mut delivered = 0u64;
        let mut deduplicated = 0u64;
        let mut dropped = 0u64;
        let mut history_append_failures = 0u32;

        // Process in configured order so decision order is deterministic.
        for domain_id in &self.domains {
            let Some(result) = results.remove(domain_id) else {
                continue;
            };

            match result {
                Ok(batch) => {
                    if let Err(e) = self.store.append_metric_history(&batch.records).await {
                        history_append_failures += 1;
                        tracing::warn!(
                            domain_id = %domain_id,
                            records = batch.records.len(),
                            error = %e,
                            "Failed to persist metric history"
                        );
                    }

                    let batch_decisions =
                        self.evaluator
                            .evaluate(domain_id, &batch.records, &self.thresholds);
                    for decision in &batch_decisions {
                        match self.sink.submit(decision).await {
                            Ok(Ack::Delivered) => delivered += 1,
                            Ok(Ack::Duplicate) => deduplicated += 1,
                            Err(_) => dropped += 1, // already logged by the sink
                        }
                    }

                    domains.insert(domain_id.clone(), collected_outcome(&batch));
                    decisions.extend(batch_decisions);
                }
                Err(e) => {
                    tracing::warn!(domain_id = %domain_id, error = %e, "Domain collection failed");
                    domains.insert(domain_id.clone(), DomainOutcome::Failed(e));
                }
            }
        }

        let finished_at = Utc::now();
        tracing::info!(
            %round_id,
            duration_ms = (finished_at - started_at).num_milliseconds(),
            decisions = decisions.len(),
            delivered,
            deduplicated,
            dropped,
            history_append_failures,
            "Collection round finished"
        );

        RoundSummary {
            round_id,
            started_at,
            finished_at,
            domains,
            decisions,
            decisions_delivered: delivered,
            decisions_deduplicated: deduplicated,
            decisions_dropped: dropped,
            history_append_failures,
        }
    }
}

fn collected_outcome(batch: &CollectedBatch) -> DomainOutcome {
    DomainOutcome::Collected {
        records: batch.records.len(),
        invalid_dropped: batch.invalid_dropped,
    }
}
