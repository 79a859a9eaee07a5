//! `metrion-daemon` -- scheduled metric collection and decision delivery.
//!
//! Loads configuration from the environment, acquires the durable store,
//! then drives one collection round per interval tick: fetch metrics from
//! every configured domain, evaluate them against the thresholds, and
//! forward edge-triggered optimization decisions to the store. A background
//! task purges metric history past its retention period.
//!
//! Environment variables are documented on
//! [`DaemonConfig::from_env`](config::DaemonConfig::from_env).

mod config;
mod retention;

use std::time::Duration;

use anyhow::Context;
use metrion_collector::domain::CollectOptions;
use metrion_collector::orchestrator::{OrchestratorConfig, MAX_CONCURRENT_COLLECTORS};
use metrion_collector::source::HttpMetricSource;
use metrion_core::backoff::BackoffConfig;
use metrion_db::TelemetryStore;
use metrion_engine::round::Engine;
use metrion_engine::sink::SinkConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::DaemonConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metrion_daemon=info,metrion_engine=info,metrion_collector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{e:#}"), "Daemon failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // --- Configuration ---
    let config = DaemonConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        domains = config.domains.len(),
        round_interval_secs = config.round_interval.as_secs(),
        round_deadline_secs = config.round_deadline.as_secs(),
        retry_attempts = config.thresholds.retry_attempts,
        "Loaded daemon configuration"
    );

    // --- Durable store ---
    let pool = metrion_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    metrion_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    metrion_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let store = TelemetryStore::new(pool.clone());

    // --- Engine ---
    let source = HttpMetricSource::new(config.endpoint_map());
    let orchestrator = OrchestratorConfig {
        collect: CollectOptions {
            max_attempts: config.thresholds.retry_attempts,
            attempt_timeout: config.attempt_timeout,
            backoff: BackoffConfig::default(),
        },
        round_deadline: config.round_deadline,
        max_concurrent: MAX_CONCURRENT_COLLECTORS,
    };
    let sink = SinkConfig {
        dedup_window: config.dedup_window,
        max_attempts: config.thresholds.retry_attempts,
        backoff: BackoffConfig::default(),
    };
    let mut engine = Engine::new(
        source,
        store,
        config.domain_ids(),
        orchestrator,
        config.thresholds,
        sink,
    );

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(retention::run(
        pool.clone(),
        config.retention_hours,
        cancel.child_token(),
    ));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    // --- Round loop ---
    // A cancellation between rounds stops the loop; a round already in
    // flight always runs to completion so its summary and decisions land.
    let mut interval = tokio::time::interval(config.round_interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                engine.run_collection_round().await;
            }
        }
    }

    // --- Shutdown ---
    let stats = engine.sink_stats();
    tracing::info!(
        delivered = stats.delivered,
        deduplicated = stats.deduplicated,
        dropped = stats.dropped,
        "Round loop stopped"
    );

    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}
