//! Per-metric breach thresholds and the retry ceiling.
//!
//! One [`ThresholdConfig`] applies uniformly across all domains, is built
//! once at startup, and is read-only for the rest of the run. Throughput is
//! collected for history but has no threshold, so the evaluator skips it.

use crate::error::ConfigError;
use crate::metric::MetricType;

/// Default performance threshold (normalized ratio).
pub const DEFAULT_PERFORMANCE_THRESHOLD: f64 = 0.7;
/// Default resource utilization threshold (normalized ratio).
pub const DEFAULT_RESOURCE_THRESHOLD: f64 = 0.8;
/// Default latency threshold in milliseconds.
pub const DEFAULT_LATENCY_THRESHOLD_MS: f64 = 100.0;
/// Default total number of fetch attempts per domain and round.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Breach thresholds for the evaluated metric types, plus the per-domain
/// retry ceiling shared by the collector and the decision sink.
///
/// A metric breaches when its observed value is strictly greater than the
/// configured threshold; equality is nominal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub performance: f64,
    pub resource: f64,
    pub latency_ms: f64,
    /// Total attempts, not retries-after-first: `3` means three fetch calls,
    /// `0` means no fetch at all.
    pub retry_attempts: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            performance: DEFAULT_PERFORMANCE_THRESHOLD,
            resource: DEFAULT_RESOURCE_THRESHOLD,
            latency_ms: DEFAULT_LATENCY_THRESHOLD_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl ThresholdConfig {
    /// Build a config, rejecting unusable values up front.
    ///
    /// Ratio thresholds must fall in `(0, 1]`; the latency threshold must be
    /// a positive finite number of milliseconds.
    pub fn new(
        performance: f64,
        resource: f64,
        latency_ms: f64,
        retry_attempts: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            performance,
            resource,
            latency_ms,
            retry_attempts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Threshold for a metric type, or `None` when the type is not evaluated.
    pub fn threshold_for(&self, metric_type: MetricType) -> Option<f64> {
        match metric_type {
            MetricType::Performance => Some(self.performance),
            MetricType::Resource => Some(self.resource),
            MetricType::Latency => Some(self.latency_ms),
            MetricType::Throughput => None,
        }
    }

    /// Check that every threshold is usable before the engine starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ratio("performance_threshold", self.performance)?;
        validate_ratio("resource_threshold", self.resource)?;
        if !self.latency_ms.is_finite() || self.latency_ms <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "latency_threshold",
                reason: format!(
                    "must be a positive number of milliseconds, got {}",
                    self.latency_ms
                ),
            });
        }
        Ok(())
    }
}

fn validate_ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be in (0, 1], got {value}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
