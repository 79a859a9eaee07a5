//! Daemon configuration, loaded once at startup from environment variables.
//!
//! Missing required values and unparseable overrides produce a typed
//! [`ConfigError`] so the binary can fail fast before the first round runs.

use std::collections::HashMap;
use std::time::Duration;

use metrion_core::error::ConfigError;
use metrion_core::thresholds::ThresholdConfig;

/// Default seconds between collection rounds.
const DEFAULT_ROUND_INTERVAL_SECS: u64 = 60;
/// Default wall-clock bound on one collection round.
const DEFAULT_ROUND_DEADLINE_SECS: u64 = 30;
/// Default bound on a single fetch attempt.
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;
/// Default metric-history retention period.
const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Immutable daemon configuration.
///
/// Built once by [`DaemonConfig::from_env`]; no component mutates it after
/// startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Monitored domains in configured order, as `(domain_id, endpoint)`.
    pub domains: Vec<(String, String)>,
    /// Breach thresholds and the retry ceiling.
    pub thresholds: ThresholdConfig,
    /// Time between round starts.
    pub round_interval: Duration,
    /// Deadline for one round; slower domains are reported as timed out.
    pub round_deadline: Duration,
    /// Bound on a single fetch attempt.
    pub attempt_timeout: Duration,
    /// Decision dedup window.
    pub dedup_window: Duration,
    /// How long metric history rows are kept before the retention task
    /// purges them.
    pub retention_hours: i64,
}

impl DaemonConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Required | Default            |
    /// |---------------------------|----------|--------------------|
    /// | `DATABASE_URL`            | yes      | --                 |
    /// | `METRIC_DOMAINS`          | yes      | -- (`id=url,...`)  |
    /// | `PERFORMANCE_THRESHOLD`   | no       | `0.7`              |
    /// | `RESOURCE_THRESHOLD`      | no       | `0.8`              |
    /// | `LATENCY_THRESHOLD_MS`    | no       | `100`              |
    /// | `RETRY_ATTEMPTS`          | no       | `3`                |
    /// | `ROUND_INTERVAL_SECS`     | no       | `60`               |
    /// | `ROUND_DEADLINE_SECS`     | no       | `30`               |
    /// | `ATTEMPT_TIMEOUT_SECS`    | no       | `10`               |
    /// | `DEDUP_WINDOW_SECS`       | no       | round interval     |
    /// | `METRICS_RETENTION_HOURS` | no       | `24`               |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingCredential("DATABASE_URL"))?;

        let raw_domains = std::env::var("METRIC_DOMAINS")
            .map_err(|_| ConfigError::MissingCredential("METRIC_DOMAINS"))?;
        let domains = parse_domains(&raw_domains)?;

        let thresholds = ThresholdConfig::new(
            env_parse(
                "PERFORMANCE_THRESHOLD",
                metrion_core::thresholds::DEFAULT_PERFORMANCE_THRESHOLD,
            )?,
            env_parse(
                "RESOURCE_THRESHOLD",
                metrion_core::thresholds::DEFAULT_RESOURCE_THRESHOLD,
            )?,
            env_parse(
                "LATENCY_THRESHOLD_MS",
                metrion_core::thresholds::DEFAULT_LATENCY_THRESHOLD_MS,
            )?,
            env_parse(
                "RETRY_ATTEMPTS",
                metrion_core::thresholds::DEFAULT_RETRY_ATTEMPTS,
            )?,
        )?;

        let round_interval_secs: u64 =
            env_parse("ROUND_INTERVAL_SECS", DEFAULT_ROUND_INTERVAL_SECS)?;
        let round_deadline_secs: u64 =
            env_parse("ROUND_DEADLINE_SECS", DEFAULT_ROUND_DEADLINE_SECS)?;
        let attempt_timeout_secs: u64 =
            env_parse("ATTEMPT_TIMEOUT_SECS", DEFAULT_ATTEMPT_TIMEOUT_SECS)?;
        // The dedup window defaults to one round so back-to-back rounds
        // observing the same sustained breach collapse to one decision.
        let dedup_window_secs: u64 = env_parse("DEDUP_WINDOW_SECS", round_interval_secs)?;
        let retention_hours: i64 =
            env_parse("METRICS_RETENTION_HOURS", DEFAULT_RETENTION_HOURS)?;

        Ok(Self {
            database_url,
            domains,
            thresholds,
            round_interval: Duration::from_secs(round_interval_secs),
            round_deadline: Duration::from_secs(round_deadline_secs),
            attempt_timeout: Duration::from_secs(attempt_timeout_secs),
            dedup_window: Duration::from_secs(dedup_window_secs),
            retention_hours,
        })
    }

    /// Domain ids in configured order.
    pub fn domain_ids(&self) -> Vec<String> {
        self.domains.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Domain id → endpoint URL map for the HTTP source.
    pub fn endpoint_map(&self) -> HashMap<String, String> {
        self.domains.iter().cloned().collect()
    }
}

/// Parse the `METRIC_DOMAINS` value: a comma-separated list of
/// `domain_id=endpoint_url` entries. At least one entry is required.
fn parse_domains(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut domains = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((id, url)) = entry.split_once('=') else {
            return Err(ConfigError::Invalid {
                name: "METRIC_DOMAINS",
                reason: format!("entry {entry:?} is not of the form domain_id=endpoint_url"),
            });
        };
        let (id, url) = (id.trim(), url.trim());
        if id.is_empty() || url.is_empty() {
            return Err(ConfigError::Invalid {
                name: "METRIC_DOMAINS",
                reason: format!("entry {entry:?} has an empty domain id or endpoint"),
            });
        }
        domains.push((id.to_string(), url.to_string()));
    }

    if domains.is_empty() {
        return Err(ConfigError::Invalid {
            name: "METRIC_DOMAINS",
            reason: "at least one domain_id=endpoint_url entry is required".to_string(),
        });
    }

    Ok(domains)
}

/// Read an optional env var, falling back to `default` when unset and
/// failing with [`ConfigError::Invalid`] when set but unparseable.
fn env_parse<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
            name,
            reason: format!("could not parse {raw:?}: {e}"),
        }),
        Err(_) => Ok(default),
    }
}
