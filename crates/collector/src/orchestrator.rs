//! Concurrent collection across all configured domains.
//!
//! Fans one [`collect_domain`] task out per domain through a bounded
//! `buffer_unordered` stream and races the whole round against a deadline.
//! Partial failure is normal: the result map always carries exactly one
//! entry per requested domain, `Ok` or `Err`.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use metrion_core::error::CollectionError;

use crate::domain::{collect_domain, CollectOptions, CollectedBatch};
use crate::source::MetricSource;

/// Upper bound on concurrently collected domains, independent of how many
/// are configured.
pub const MAX_CONCURRENT_COLLECTORS: usize = 16;

/// Default wall-clock bound on a whole collection round.
pub const DEFAULT_ROUND_DEADLINE: Duration = Duration::from_secs(30);

/// Tunable parameters for a collection round.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-domain collection options (attempts, attempt timeout, backoff).
    pub collect: CollectOptions,
    /// Deadline for the round as a whole. Domains still unfinished when it
    /// elapses are cancelled and reported as timed out.
    pub round_deadline: Duration,
    /// Configured concurrency cap; the effective cap never exceeds the
    /// domain count.
    pub max_concurrent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            collect: CollectOptions::default(),
            round_deadline: DEFAULT_ROUND_DEADLINE,
            max_concurrent: MAX_CONCURRENT_COLLECTORS,
        }
    }
}

/// Collect every domain concurrently and return one result per domain.
///
/// Domains complete in any order. When the round deadline elapses, the
/// unfinished collection futures are dropped — cancellation is cooperative,
/// at their next await point — and those domains are reported as
/// [`CollectionError::Timeout`]. Domains that already finished keep their
/// results. No state is shared between domain tasks, so one domain's
/// failure never affects another's result.
pub async fn collect_all<S: MetricSource>(
    domains: &[String],
    source: &S,
    config: &OrchestratorConfig,
) -> HashMap<String, Result<CollectedBatch, CollectionError>> {
    let mut results: HashMap<String, Result<CollectedBatch, CollectionError>> =
        HashMap::with_capacity(domains.len());
    if domains.is_empty() {
        return results;
    }

    let concurrency = effective_concurrency(config.max_concurrent, domains.len());
    let opts = &config.collect;

    let mut stream = futures::stream::iter(domains.iter().map(|domain_id| async move {
        let result = collect_domain(domain_id, source, opts).await;
        (domain_id.clone(), result)
    }))
    .buffer_unordered(concurrency);

    let deadline = tokio::time::sleep(config.round_deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            next = stream.next() => {
                match next {
                    Some((domain_id, result)) => {
                        results.insert(domain_id, result);
                    }
                    None => break,
                }
            }
            _ = &mut deadline => {
                tracing::warn!(
                    deadline_ms = config.round_deadline.as_millis() as u64,
                    unfinished = domains.len() - results.len(),
                    "Round deadline elapsed, cancelling unfinished domains"
                );
                break;
            }
        }
    }
    // Dropping the stream drops the in-flight collection futures.
    drop(stream);

    for domain_id in domains {
        results
            .entry(domain_id.clone())
            .or_insert_with(|| Err(CollectionError::Timeout(config.round_deadline)));
    }

    results
}

/// Cap concurrency at the domain count, never below one.
fn effective_concurrency(configured: usize, domain_count: usize) -> usize {
    configured.min(domain_count).max(1)
}
