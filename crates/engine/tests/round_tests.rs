//! End-to-end round tests: scripted source in, fake store out.
//!
//! Each test drives [`Engine::run_collection_round`] against a
//! [`FakeSource`] whose fetch results are queued per domain and a
//! [`FakeStore`] that records appends in memory and can inject failures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use metrion_collector::domain::CollectOptions;
use metrion_collector::orchestrator::OrchestratorConfig;
use metrion_collector::source::{MetricSource, SourceError};
use metrion_core::backoff::BackoffConfig;
use metrion_core::decision::OptimizationDecision;
use metrion_core::error::{CollectionError, StoreError};
use metrion_core::metric::{MetricRecord, MetricType, RawMetricRecord};
use metrion_core::store::{AppendOutcome, DecisionStore, MetricHistoryStore};
use metrion_core::thresholds::ThresholdConfig;
use metrion_core::types::Timestamp;
use metrion_engine::{DomainOutcome, Engine, SinkConfig};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

type FetchResult = Result<Vec<RawMetricRecord>, SourceError>;

fn raw(domain: &str, metric_type: &str, value: f64) -> RawMetricRecord {
    RawMetricRecord {
        domain_id: Some(domain.to_string()),
        metric_type: Some(metric_type.to_string()),
        value: Some(value),
        timestamp: None,
        metadata: None,
    }
}

fn raw_at(domain: &str, metric_type: &str, value: f64, timestamp: Timestamp) -> RawMetricRecord {
    let mut record = raw(domain, metric_type, value);
    record.timestamp = Some(timestamp);
    record
}

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

/// Engine over `source` and `store` with millisecond-scale timing so retry
/// and failure paths finish quickly.
fn fast_engine(
    source: FakeSource,
    store: FakeStore,
    domains: &[&str],
) -> Engine<FakeSource, FakeStore> {
    let orchestrator = OrchestratorConfig {
        collect: CollectOptions {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(200),
            backoff: fast_backoff(),
        },
        round_deadline: Duration::from_secs(5),
        max_concurrent: 4,
    };
    let sink = SinkConfig {
        dedup_window: Duration::from_secs(60),
        max_attempts: 2,
        backoff: fast_backoff(),
    };
    Engine::new(
        source,
        store,
        domains.iter().map(|d| d.to_string()).collect(),
        orchestrator,
        ThresholdConfig::default(),
        sink,
    )
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Source whose fetch results are scripted per domain. Each fetch consumes
/// the next queued result; an exhausted queue yields an empty batch.
#[derive(Default)]
struct FakeSource {
    scripts: Mutex<HashMap<String, VecDeque<FetchResult>>>,
}

impl FakeSource {
    fn new() -> Self {
        Self::default()
    }

    fn script(&self, domain_id: &str, result: FetchResult) {
        self.scripts
            .lock()
            .unwrap()
            .entry(domain_id.to_string())
            .or_default()
            .push_back(result);
    }
}

impl MetricSource for FakeSource {
    async fn fetch(&self, domain_id: &str, _timeout: Duration) -> FetchResult {
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(domain_id)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// In-memory store implementing both append traits, with per-trait failure
/// injection counters.
#[derive(Clone, Default)]
struct FakeStore {
    history: Arc<Mutex<Vec<MetricRecord>>>,
    decision_keys: Arc<Mutex<Vec<String>>>,
    history_failures: Arc<AtomicU32>,
    decision_failures: Arc<AtomicU32>,
}

impl FakeStore {
    fn new() -> Self {
        Self::default()
    }

    fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    fn decision_keys(&self) -> Vec<String> {
        self.decision_keys.lock().unwrap().clone()
    }

    fn fail_next_history_appends(&self, n: u32) {
        self.history_failures.store(n, Ordering::SeqCst);
    }

    fn fail_next_decision_appends(&self, n: u32) {
        self.decision_failures.store(n, Ordering::SeqCst);
    }
}

/// Consume one injected failure if any remain.
fn take_injected(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MetricHistoryStore for FakeStore {
    async fn append_metric_history(&self, records: &[MetricRecord]) -> Result<(), StoreError> {
        if take_injected(&self.history_failures) {
            return Err(StoreError("injected history failure".to_string()));
        }
        self.history.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

impl DecisionStore for FakeStore {
    async fn append_decision(
        &self,
        decision: &OptimizationDecision,
    ) -> Result<AppendOutcome, StoreError> {
        if take_injected(&self.decision_failures) {
            return Err(StoreError("injected decision failure".to_string()));
        }
        let mut keys = self.decision_keys.lock().unwrap();
        if keys.iter().any(|k| k == &decision.dedup_key) {
            return Ok(AppendOutcome::AlreadyExists);
        }
        keys.push(decision.dedup_key.clone());
        Ok(AppendOutcome::Appended)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// A round reports one outcome per configured domain, persists the valid
/// records, and delivers the decisions the batches triggered.
#[tokio::test]
async fn round_covers_every_configured_domain() {
    let source = FakeSource::new();
    source.script(
        "payments",
        Ok(vec![
            raw("payments", "latency", 120.0),
            RawMetricRecord::default(), // invalid: dropped, not fatal
        ]),
    );
    source.script("search", Ok(vec![raw("search", "resource", 0.5)]));

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments", "search"]);

    let summary = engine.run_collection_round().await;

    assert_eq!(summary.domains.len(), 2);
    assert_matches!(
        summary.domains["payments"],
        DomainOutcome::Collected { records: 1, invalid_dropped: 1 }
    );
    assert_matches!(
        summary.domains["search"],
        DomainOutcome::Collected { records: 1, invalid_dropped: 0 }
    );

    assert_eq!(summary.decisions.len(), 1);
    assert_eq!(summary.decisions[0].domain_id, "payments");
    assert_eq!(summary.decisions[0].trigger_metric_type, MetricType::Latency);
    assert_eq!(summary.decisions_delivered, 1);
    assert_eq!(summary.decisions_deduplicated, 0);
    assert_eq!(summary.decisions_dropped, 0);

    assert_eq!(store.history_len(), 2);
    assert_eq!(store.decision_keys().len(), 1);
}

/// A batch that rises above the threshold once yields exactly one decision,
/// for the first breaching observation.
#[tokio::test]
async fn single_breach_in_batch_emits_one_decision() {
    let source = FakeSource::new();
    source.script(
        "payments",
        Ok(vec![
            raw("payments", "latency", 80.0),
            raw("payments", "latency", 120.0),
            raw("payments", "latency", 130.0),
            raw("payments", "latency", 90.0),
        ]),
    );

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let summary = engine.run_collection_round().await;

    assert_eq!(summary.decisions.len(), 1);
    assert_eq!(summary.decisions[0].observed_value, 120.0);
    assert!((summary.decisions[0].severity - 0.2).abs() < 1e-9);
    assert_eq!(store.history_len(), 4);
}

/// Breach state carries across rounds: a sustained breach is reported once,
/// and only a clear round re-arms detection.
#[tokio::test]
async fn sustained_breach_across_rounds_emits_one_decision() {
    let source = FakeSource::new();
    source.script("payments", Ok(vec![raw("payments", "latency", 120.0)]));
    source.script("payments", Ok(vec![raw("payments", "latency", 125.0)]));
    source.script("payments", Ok(vec![raw("payments", "latency", 90.0)]));
    source.script("payments", Ok(vec![raw("payments", "latency", 130.0)]));

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    assert_eq!(engine.run_collection_round().await.decisions.len(), 1);
    assert_eq!(engine.run_collection_round().await.decisions.len(), 0);
    assert_eq!(engine.run_collection_round().await.decisions.len(), 0);
    assert_eq!(engine.run_collection_round().await.decisions.len(), 1);

    assert_eq!(store.decision_keys().len(), 2);
    let stats = engine.sink_stats();
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.dropped, 0);
}

/// Re-serving the same breach start after a dip produces the same dedup key
/// and is suppressed by the sink, not stored twice.
#[tokio::test]
async fn replayed_breach_start_is_deduplicated() {
    let breach_started = Utc::now();
    let source = FakeSource::new();
    source.script(
        "payments",
        Ok(vec![raw_at("payments", "latency", 120.0, breach_started)]),
    );
    source.script(
        "payments",
        Ok(vec![
            raw("payments", "latency", 90.0),
            raw_at("payments", "latency", 120.0, breach_started),
        ]),
    );

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let first = engine.run_collection_round().await;
    assert_eq!(first.decisions_delivered, 1);

    let second = engine.run_collection_round().await;
    assert_eq!(second.decisions.len(), 1);
    assert_eq!(second.decisions_delivered, 0);
    assert_eq!(second.decisions_deduplicated, 1);

    assert_eq!(store.decision_keys().len(), 1);
}

/// A history append failure is counted on the summary but never blocks
/// evaluation or decision delivery for that batch.
#[tokio::test]
async fn history_failure_does_not_block_evaluation() {
    let source = FakeSource::new();
    source.script("payments", Ok(vec![raw("payments", "latency", 150.0)]));

    let store = FakeStore::new();
    store.fail_next_history_appends(1);
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let summary = engine.run_collection_round().await;

    assert_eq!(summary.history_append_failures, 1);
    assert_matches!(
        summary.domains["payments"],
        DomainOutcome::Collected { records: 1, .. }
    );
    assert_eq!(summary.decisions_delivered, 1);
    assert_eq!(store.history_len(), 0);
    assert_eq!(store.decision_keys().len(), 1);
}

/// One unreachable domain is reported as failed without disturbing the
/// others in the same round.
#[tokio::test]
async fn failed_domain_is_isolated() {
    let source = FakeSource::new();
    source.script("payments", Ok(vec![raw("payments", "latency", 50.0)]));
    for _ in 0..2 {
        source.script(
            "search",
            Err(SourceError::Transport("connection refused".to_string())),
        );
    }

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments", "search"]);

    let summary = engine.run_collection_round().await;

    assert_matches!(
        summary.domains["payments"],
        DomainOutcome::Collected { records: 1, .. }
    );
    assert_matches!(
        &summary.domains["search"],
        DomainOutcome::Failed(CollectionError::DomainUnreachable { attempts: 2, .. })
    );
    assert!(summary.decisions.is_empty());
    assert_eq!(store.history_len(), 1);
}

/// A decision that cannot be stored is dropped after the sink's retries and
/// counted on the summary; the round itself still completes.
#[tokio::test]
async fn decision_store_outage_drops_after_retries() {
    let source = FakeSource::new();
    source.script("payments", Ok(vec![raw("payments", "latency", 140.0)]));

    let store = FakeStore::new();
    store.fail_next_decision_appends(2); // sink is configured for 2 attempts
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let summary = engine.run_collection_round().await;

    assert_eq!(summary.decisions.len(), 1);
    assert_eq!(summary.decisions_dropped, 1);
    assert_eq!(summary.decisions_delivered, 0);
    assert!(store.decision_keys().is_empty());
    assert_eq!(engine.sink_stats().dropped, 1);
}

/// Throughput observations reach history but never the decision path.
#[tokio::test]
async fn throughput_is_persisted_but_never_evaluated() {
    let source = FakeSource::new();
    source.script(
        "payments",
        Ok(vec![raw("payments", "throughput", 1_000_000.0)]),
    );

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let summary = engine.run_collection_round().await;

    assert_eq!(store.history_len(), 1);
    assert!(summary.decisions.is_empty());
    assert_eq!(store.decision_keys().len(), 0);
}

/// Raw payload records carrying unknown extra fields still flow through a
/// round once parsed from the wire shape.
#[tokio::test]
async fn wire_shaped_payload_flows_through_round() {
    let payload = serde_json::json!([
        {
            "domain_id": "payments",
            "metric_type": "resource",
            "value": 0.95,
            "collector_version": "2.1"
        }
    ]);
    let records: Vec<RawMetricRecord> = serde_json::from_value(payload).unwrap();

    let source = FakeSource::new();
    source.script("payments", Ok(records));

    let store = FakeStore::new();
    let mut engine = fast_engine(source, store.clone(), &["payments"]);

    let summary = engine.run_collection_round().await;

    assert_matches!(
        summary.domains["payments"],
        DomainOutcome::Collected { records: 1, invalid_dropped: 0 }
    );
    assert_eq!(summary.decisions.len(), 1);
    assert_eq!(summary.decisions[0].trigger_metric_type, MetricType::Resource);
}
