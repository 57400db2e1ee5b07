mod config;
mod demo;

use std::sync::Arc;

use anyhow::Context as _;
use edge_connect::{ConnectConfig, HttpConnection};
use edge_core::{ComponentRegistry, Trainer};
use edge_observe::{ChainProgress, LogProgress, LoggerConfig, init_logger};
use edge_prometheus::{Encoder, PrometheusMetrics, TextEncoder};
use edge_runner::{RunnerConfig, SessionOutcome, SessionRunner};
use tracing::{debug, error, info};

use config::AgentConfig;
use demo::{AVERAGING_METHOD, AveragingTrainer, SyntheticSource};

const SYNTHETIC_SAMPLES: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    edge_core::init_uptime();

    // 1) Config + logger
    let cfg = AgentConfig::from_env()?;
    init_logger(&LoggerConfig {
        format: cfg.log_format,
        level: cfg.log_level.clone(),
        ..Default::default()
    })?;
    info!(endpoint = %cfg.endpoint, job = %cfg.job_name, "edge agent starting");

    // 2) Coordinator connection
    let mut connect = ConnectConfig::new(cfg.endpoint.clone());
    if let Some(device_id) = &cfg.device_id {
        connect.device_id = device_id.clone();
    }
    info!(device_id = %connect.device_id, platform = edge_core::platform(), "device identity");
    let connection = HttpConnection::new(connect).context("coordinator connection")?;

    // 3) Trainers, metrics, progress
    let mut registry = ComponentRegistry::new();
    registry.register_trainer(AVERAGING_METHOD, |_| {
        Ok(Arc::new(AveragingTrainer) as Arc<dyn Trainer>)
    });
    let metrics = PrometheusMetrics::new().context("metrics registry")?;
    let progress = ChainProgress::new().with(Arc::new(LogProgress));

    // 4) Runner
    let mut builder = SessionRunner::builder(
        RunnerConfig::new(cfg.job_name.clone()).with_job_timeout(cfg.job_timeout),
        Arc::new(connection),
        Arc::new(SyntheticSource {
            samples: SYNTHETIC_SAMPLES,
        }),
    )
    .registry(registry)
    .metrics(Arc::new(metrics.clone()))
    .progress(Arc::new(progress));
    if !cfg.methods.is_empty() {
        builder = builder.methods(cfg.methods.clone());
    }
    let runner = builder.build()?;
    info!(methods = ?runner.handle().methods().methods, "runner ready, press Ctrl+C to stop");

    // 5) Stop on Ctrl+C
    let handle = runner.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down...");
            handle.stop(Some("ctrl-c"));
        }
    });

    let outcome = runner.run().await;
    dump_metrics(&metrics);

    match outcome {
        SessionOutcome::Failed(reason) => {
            error!(%reason, uptime_secs = edge_core::uptime_seconds(), "session failed");
            anyhow::bail!("session failed: {reason}")
        }
        other => {
            info!(outcome = %other, uptime_secs = edge_core::uptime_seconds(), "edge agent exiting");
            Ok(())
        }
    }
}

fn dump_metrics(metrics: &PrometheusMetrics) {
    let mut buf = Vec::new();
    match TextEncoder::new().encode(&metrics.gather(), &mut buf) {
        Ok(()) => debug!(metrics = %String::from_utf8_lossy(&buf), "final metrics"),
        Err(e) => debug!(error = %e, "metrics encoding failed"),
    }
}
