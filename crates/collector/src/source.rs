//! Metric source interface and the HTTP implementation.
//!
//! A [`MetricSource`] hands back the current raw observations for one
//! domain. The production implementation polls per-domain HTTP endpoints;
//! tests substitute in-process fakes.

use std::collections::HashMap;
use std::time::Duration;

use metrion_core::metric::RawMetricRecord;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single fetch against a domain source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The fetch could not complete (network, DNS, connection refused).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status code.
    #[error("Source returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body did not decode to a record list. Deterministic:
    /// retrying the same fetch cannot succeed.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No endpoint is configured for the requested domain.
    #[error("No endpoint configured for domain: {0}")]
    UnknownDomain(String),
}

impl SourceError {
    /// Whether a retry of the same fetch can possibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Transport(_) | SourceError::HttpStatus(_)
        )
    }
}

// ---------------------------------------------------------------------------
// MetricSource
// ---------------------------------------------------------------------------

/// Trait implemented by anything that can produce raw records for a domain.
///
/// One fetch corresponds to one collection attempt; the retry loop around
/// it lives in [`collect_domain`](crate::domain::collect_domain).
pub trait MetricSource: Send + Sync {
    /// Fetch the current raw records for `domain_id`, bounded by `timeout`.
    fn fetch(
        &self,
        domain_id: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Vec<RawMetricRecord>, SourceError>> + Send;
}

// ---------------------------------------------------------------------------
// HttpMetricSource
// ---------------------------------------------------------------------------

/// Polls per-domain HTTP endpoints that answer with a JSON record list.
pub struct HttpMetricSource {
    client: reqwest::Client,
    /// Domain id → endpoint URL.
    endpoints: HashMap<String, String>,
}

impl HttpMetricSource {
    /// Create a source over a fixed endpoint map with a pre-configured
    /// HTTP client.
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("metrion/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, endpoints }
    }

    /// The set of domains this source can serve.
    pub fn domain_ids(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    fn endpoint_for(&self, domain_id: &str) -> Result<&str, SourceError> {
        self.endpoints
            .get(domain_id)
            .map(String::as_str)
            .ok_or_else(|| SourceError::UnknownDomain(domain_id.to_string()))
    }
}

impl MetricSource for HttpMetricSource {
    async fn fetch(
        &self,
        domain_id: &str,
        timeout: Duration,
    ) -> Result<Vec<RawMetricRecord>, SourceError> {
        let url = self.endpoint_for(domain_id)?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status().as_u16()));
        }

        response.json::<Vec<RawMetricRecord>>().await.map_err(|e| {
            if e.is_decode() {
                SourceError::MalformedPayload(e.to_string())
            } else {
                SourceError::Transport(e.to_string())
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
