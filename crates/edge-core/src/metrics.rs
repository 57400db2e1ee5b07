use std::time::Duration;

/// Why the runner is waiting before polling again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryReason {
    JobRetry,
    TaskRetry,
    NotSelected,
    Unknown,
    Network,
    ResultRetry,
}

impl RetryReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryReason::JobRetry => "job_retry",
            RetryReason::TaskRetry => "task_retry",
            RetryReason::NotSelected => "not_selected",
            RetryReason::Unknown => "unknown_status",
            RetryReason::Network => "network",
            RetryReason::ResultRetry => "result_retry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    Sent,
    Failed,
    Aborted,
}

impl TaskOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskOutcome::Sent => "sent",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Aborted => "aborted",
        }
    }
}

/// Session counters and timings.
///
/// Every hook defaults to a no-op so backends only implement what they export.
pub trait MetricsBackend: Send + Sync {
    fn job_received(&self, _job_name: &str) {}
    fn task_received(&self, _task_name: &str) {}
    fn task_completed(&self, _task_name: &str, _outcome: TaskOutcome, _duration: Duration) {}
    fn result_sent(&self, _task_name: &str) {}
    fn retry(&self, _reason: RetryReason) {}
    /// `outcome` is `completed`, `stopped` or `failed`.
    fn session_end(&self, _outcome: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {}
