use std::time::Duration;

use edge_core::{MetricsBackend, RetryReason, TaskOutcome};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, proto::MetricFamily};

/// Task duration buckets in seconds; local training runs from sub-second to tens of minutes.
const DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1800.0];

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    jobs_received: IntCounterVec,
    tasks_received: IntCounterVec,
    tasks_completed: IntCounterVec,
    task_duration: HistogramVec,
    results_sent: IntCounterVec,
    retries: IntCounterVec,
    sessions: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let jobs_received = IntCounterVec::new(
            Opts::new("edge_jobs_received_total", "Jobs accepted from the coordinator"),
            &["job"],
        )?;
        let tasks_received = IntCounterVec::new(
            Opts::new("edge_tasks_received_total", "Tasks received from the coordinator"),
            &["task"],
        )?;
        let tasks_completed = IntCounterVec::new(
            Opts::new("edge_tasks_completed_total", "Tasks finished, by outcome"),
            &["task", "outcome"],
        )?;
        let task_duration = HistogramVec::new(
            HistogramOpts::new("edge_task_duration_seconds", "Task pipeline duration")
                .buckets(DURATION_BUCKETS.to_vec()),
            &["task"],
        )?;
        let results_sent = IntCounterVec::new(
            Opts::new("edge_results_sent_total", "Results accepted by the coordinator"),
            &["task"],
        )?;
        let retries = IntCounterVec::new(
            Opts::new("edge_retries_total", "Polling retries, by reason"),
            &["reason"],
        )?;
        let sessions = IntCounterVec::new(
            Opts::new("edge_sessions_total", "Finished sessions, by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(jobs_received.clone()))?;
        registry.register(Box::new(tasks_received.clone()))?;
        registry.register(Box::new(tasks_completed.clone()))?;
        registry.register(Box::new(task_duration.clone()))?;
        registry.register(Box::new(results_sent.clone()))?;
        registry.register(Box::new(retries.clone()))?;
        registry.register(Box::new(sessions.clone()))?;

        Ok(Self {
            registry,
            jobs_received,
            tasks_received,
            tasks_completed,
            task_duration,
            results_sent,
            retries,
            sessions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn job_received(&self, job_name: &str) {
        self.jobs_received.with_label_values(&[job_name]).inc();
    }

    fn task_received(&self, task_name: &str) {
        self.tasks_received.with_label_values(&[task_name]).inc();
    }

    fn task_completed(&self, task_name: &str, outcome: TaskOutcome, duration: Duration) {
        self.tasks_completed
            .with_label_values(&[task_name, outcome.as_label()])
            .inc();
        self.task_duration
            .with_label_values(&[task_name])
            .observe(duration.as_secs_f64());
    }

    fn result_sent(&self, task_name: &str) {
        self.results_sent.with_label_values(&[task_name]).inc();
    }

    fn retry(&self, reason: RetryReason) {
        self.retries.with_label_values(&[reason.as_label()]).inc();
    }

    fn session_end(&self, outcome: &str) {
        self.sessions.with_label_values(&[outcome]).inc();
    }
}
