//! Prometheus metrics backend for the edge session runner.
//!
//! [`PrometheusMetrics`] implements [`edge_core::MetricsBackend`] on its own [`Registry`].
//! The crate does not serve `/metrics`; encode [`PrometheusMetrics::gather`] with a [`TextEncoder`] from the host's HTTP stack.
//!
//! ## Metrics
//! - `edge_jobs_received_total{job}` - Counter
//! - `edge_tasks_received_total{task}` - Counter
//! - `edge_tasks_completed_total{task, outcome}` - Counter
//! - `edge_task_duration_seconds{task}` - Histogram
//! - `edge_results_sent_total{task}` - Counter
//! - `edge_retries_total{reason}` - Counter
//! - `edge_sessions_total{outcome}` - Counter

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
