//! Decision sink: dedup window plus retrying store delivery.
//!
//! The evaluator can emit the same logical decision more than once when
//! rounds overlap observations; the sink suppresses repeats of a dedup key
//! inside a sliding window without touching the store, and absorbs
//! store-level conflicts for anything that slips past the window. Delivery
//! failures are retried with exponential backoff; a decision that exhausts
//! its attempts is dropped and counted — decision loss is tolerated, silent
//! loss is not.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use metrion_core::backoff::{next_delay, BackoffConfig};
use metrion_core::decision::OptimizationDecision;
use metrion_core::error::SinkError;
use metrion_core::store::{AppendOutcome, DecisionStore};
use metrion_core::thresholds::DEFAULT_RETRY_ATTEMPTS;
use metrion_core::types::Timestamp;

/// Default width of the dedup window. Matches the default round interval so
/// back-to-back rounds observing one sustained breach collapse to a single
/// stored decision.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(60);

/// Tunable parameters for the decision sink.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// How long a delivered dedup key suppresses identical submissions.
    pub dedup_window: Duration,
    /// Total delivery attempts per decision: `0` means drop without trying.
    pub max_attempts: u32,
    /// Delay policy between delivery attempts.
    pub backoff: BackoffConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Caller-visible outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The decision reached the durable store as a new row.
    Delivered,
    /// The decision was already known, in-window or in-store; nothing new
    /// was written.
    Duplicate,
}

/// Cumulative submission counters, snapshot-readable at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub delivered: u64,
    pub deduplicated: u64,
    pub dropped: u64,
}

/// Deduplicating forwarder from the evaluator to the durable store.
pub struct DecisionSink<S: DecisionStore> {
    store: S,
    config: SinkConfig,
    /// Dedup key → when it was first delivered. Only successful deliveries
    /// are remembered; a failed one may be retried by a later submission.
    seen: HashMap<String, Timestamp>,
    stats: SinkStats,
}

impl<S: DecisionStore> DecisionSink<S> {
    pub fn new(store: S, config: SinkConfig) -> Self {
        Self {
            store,
            config,
            seen: HashMap::new(),
            stats: SinkStats::default(),
        }
    }

    /// Submit one decision for delivery.
    ///
    /// Returns [`Ack::Duplicate`] when the dedup key was delivered within
    /// the window or the store already holds it; [`Ack::Delivered`] when a
    /// new row was written. Exhausting delivery retries yields
    /// [`SinkError::DeliveryFailed`] and the decision is dropped.
    pub async fn submit(&mut self, decision: &OptimizationDecision) -> Result<Ack, SinkError> {
        let now = Utc::now();
        self.purge_expired(now);

        if self.seen.contains_key(&decision.dedup_key) {
            self.stats.deduplicated += 1;
            tracing::debug!(dedup_key = %decision.dedup_key, "Duplicate decision suppressed in-window");
            return Ok(Ack::Duplicate);
        }

        match self.forward(decision).await {
            Ok(AppendOutcome::Appended) => {
                self.seen.insert(decision.dedup_key.clone(), now);
                self.stats.delivered += 1;
                Ok(Ack::Delivered)
            }
            Ok(AppendOutcome::AlreadyExists) => {
                self.seen.insert(decision.dedup_key.clone(), now);
                self.stats.deduplicated += 1;
                Ok(Ack::Duplicate)
            }
            Err(e) => {
                self.stats.dropped += 1;
                tracing::error!(
                    dedup_key = %decision.dedup_key,
                    domain_id = %decision.domain_id,
                    error = %e,
                    "Decision dropped after delivery retries"
                );
                Err(e)
            }
        }
    }

    /// Cumulative counters since the sink was created.
    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Number of dedup keys currently inside the window.
    pub fn tracked_keys(&self) -> usize {
        self.seen.len()
    }

    /// Push one decision to the store with retry.
    async fn forward(&self, decision: &OptimizationDecision) -> Result<AppendOutcome, SinkError> {
        let mut delay = self.config.backoff.initial_delay;
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, &self.config.backoff);
            }

            match self.store.append_decision(decision).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    tracing::warn!(
                        dedup_key = %decision.dedup_key,
                        attempt,
                        error = %e,
                        "Decision delivery attempt failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(SinkError::DeliveryFailed {
            attempts: self.config.max_attempts,
            last_error: last_error.unwrap_or_else(|| "no attempts were made".to_string()),
        })
    }

    /// Drop window entries older than the dedup window.
    fn purge_expired(&mut self, now: Timestamp) {
        let window =
            chrono::Duration::from_std(self.config.dedup_window).expect("valid duration");
        self.seen
            .retain(|_, delivered_at| now.signed_duration_since(*delivered_at) < window);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
