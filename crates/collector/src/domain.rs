//! Single-domain collection: fetch, retry, validate.
//!
//! One [`collect_domain`] call makes up to `max_attempts` fetches against a
//! source, backing off exponentially between transient failures. Raw records
//! from a successful fetch pass through the validator; invalid ones are
//! dropped and counted, never fatal to the batch.

use std::time::Duration;

use chrono::Utc;
use metrion_core::backoff::{next_delay, BackoffConfig};
use metrion_core::error::CollectionError;
use metrion_core::metric::{validate, MetricRecord, RawMetricRecord};
use metrion_core::thresholds::DEFAULT_RETRY_ATTEMPTS;

use crate::source::MetricSource;

/// Default wall-clock bound on a single fetch attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunable parameters for collecting one domain.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Total fetch attempts: `3` means three fetch calls, `0` means none.
    pub max_attempts: u32,
    /// Wall-clock bound on each individual fetch.
    pub attempt_timeout: Duration,
    /// Delay policy between consecutive attempts.
    pub backoff: BackoffConfig,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Validated output of one domain collection.
#[derive(Debug, Clone)]
pub struct CollectedBatch {
    pub domain_id: String,
    pub records: Vec<MetricRecord>,
    /// Records the source returned that failed validation and were dropped.
    pub invalid_dropped: u32,
}

/// Collect one domain's metrics with timeout and retry.
///
/// Transient source errors and attempt timeouts are retried up to
/// `opts.max_attempts` total attempts; permanent errors (malformed payload,
/// unknown domain) abort the loop immediately. Exhaustion yields
/// [`CollectionError::DomainUnreachable`] carrying the attempt count and the
/// last underlying error.
pub async fn collect_domain<S: MetricSource>(
    domain_id: &str,
    source: &S,
    opts: &CollectOptions,
) -> Result<CollectedBatch, CollectionError> {
    let mut delay = opts.backoff.initial_delay;
    let mut last_error: Option<String> = None;

    for attempt in 1..=opts.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
            delay = next_delay(delay, &opts.backoff);
        }

        match tokio::time::timeout(opts.attempt_timeout, source.fetch(domain_id, opts.attempt_timeout))
            .await
        {
            Ok(Ok(raw_records)) => {
                return Ok(validate_batch(domain_id, raw_records));
            }
            Ok(Err(e)) if !e.is_transient() => {
                tracing::warn!(domain_id, attempt, error = %e, "Permanent source error, not retrying");
                return Err(CollectionError::DomainUnreachable {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Ok(Err(e)) => {
                tracing::warn!(domain_id, attempt, error = %e, "Fetch attempt failed");
                last_error = Some(e.to_string());
            }
            Err(_) => {
                tracing::warn!(
                    domain_id,
                    attempt,
                    timeout_ms = opts.attempt_timeout.as_millis() as u64,
                    "Fetch attempt timed out"
                );
                last_error = Some(format!(
                    "attempt timed out after {}ms",
                    opts.attempt_timeout.as_millis()
                ));
            }
        }
    }

    Err(CollectionError::DomainUnreachable {
        attempts: opts.max_attempts,
        last_error: last_error.unwrap_or_else(|| "no attempts were made".to_string()),
    })
}

/// Run every raw record through the validator, dropping and counting the
/// invalid ones.
fn validate_batch(domain_id: &str, raw_records: Vec<RawMetricRecord>) -> CollectedBatch {
    let collected_at = Utc::now();
    let mut records = Vec::with_capacity(raw_records.len());
    let mut invalid_dropped = 0u32;

    for raw in raw_records {
        match validate(raw, collected_at) {
            Ok(record) => records.push(record),
            Err(e) => {
                invalid_dropped += 1;
                tracing::warn!(domain_id, error = %e, "Dropping invalid record");
            }
        }
    }

    CollectedBatch {
        domain_id: domain_id.to_string(),
        records,
        invalid_dropped,
    }
}
