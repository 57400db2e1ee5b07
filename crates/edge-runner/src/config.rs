use std::time::Duration;

use crate::RunnerError;

/// Polling budgets and retry policy of a session.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Job to ask the coordinator for.
    pub job_name: String,
    /// Wall-clock budget of one job search and of one task search.
    pub job_timeout: Duration,
    /// Wait used when a RETRY carries no `retry_wait` and for unknown statuses.
    pub default_retry_wait: Duration,
    /// Wait after a transport failure.
    pub network_retry_delay: Duration,
    /// Consecutive "not selected" retries before looking for another job.
    pub max_not_selected_retries: u32,
    /// Total attempts of one result send when the transport fails.
    pub max_result_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            job_name: String::new(),
            job_timeout: Duration::from_secs(600),
            default_retry_wait: Duration::from_millis(5000),
            network_retry_delay: Duration::from_millis(5000),
            max_not_selected_retries: 10,
            max_result_attempts: 3,
        }
    }
}

impl RunnerConfig {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            ..Self::default()
        }
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.job_name.trim().is_empty() {
            return Err(RunnerError::InvalidConfig("job name is empty".into()));
        }
        if self.job_timeout.is_zero() {
            return Err(RunnerError::InvalidConfig("job timeout must be positive".into()));
        }
        if self.max_not_selected_retries == 0 || self.max_result_attempts == 0 {
            return Err(RunnerError::InvalidConfig("retry budgets must be positive".into()));
        }
        Ok(())
    }
}
