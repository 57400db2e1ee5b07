//! Job and task polling.
use std::time::Duration;

use edge_connect::ConnectError;
use edge_core::RetryReason;
use edge_model::{Job, StatusClass, Task};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Session, SessionRunner};
use crate::RunnerError;

/// Retry message fragment meaning the coordinator picked other devices for this round.
const NOT_SELECTED: &str = "not selected";

pub(super) enum TaskPoll {
    Task(Task),
    /// NO_JOB, or this device was repeatedly not selected.
    NextJob,
    TimedOut,
}

impl SessionRunner {
    /// Poll `fetch_job` until a job is offered.
    ///
    /// Returns `None` when `job_timeout` runs out, including in the middle of a call; terminal statuses end the session.
    pub(super) async fn acquire_job(&self) -> Result<Option<Job>, RunnerError> {
        let deadline = Instant::now() + self.cfg.job_timeout;

        loop {
            self.checkpoint()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                info!(timeout = ?self.cfg.job_timeout, "no job within budget");
                return Ok(None);
            }

            let capabilities = self.capabilities.snapshot();
            debug!(job = %self.cfg.job_name, methods = ?capabilities, "fetching job");
            let call = self.coordinator.fetch_job(&self.cfg.job_name, &capabilities);
            let Ok(fetched) = tokio::time::timeout(remaining, call).await else {
                info!(timeout = ?self.cfg.job_timeout, "job fetch outlived the budget");
                return Ok(None);
            };
            self.checkpoint()?;

            let response = match fetched {
                Ok(response) => response,
                Err(e) => {
                    self.network_backoff(e, remaining).await?;
                    continue;
                }
            };

            match response.status.class() {
                StatusClass::Continue => {
                    return Ok(Some(response.into_job(&self.cfg.job_name)?));
                }
                StatusClass::Terminal => {
                    return Err(RunnerError::ServerStopped {
                        status: response.status.to_string(),
                        message: response.message,
                    });
                }
                StatusClass::RetryTask | StatusClass::LookForNewJob => {
                    let wait = self.retry_wait(response.retry_wait);
                    debug!(status = %response.status, ?wait, "job not ready, retrying");
                    self.metrics.retry(RetryReason::JobRetry);
                    self.pause(wait.min(remaining)).await?;
                }
                StatusClass::Unknown => {
                    warn!(status = %response.status, "unexpected job status, retrying");
                    self.metrics.retry(RetryReason::Unknown);
                    self.pause(self.cfg.default_retry_wait.min(remaining)).await?;
                }
            }
        }
    }

    /// Poll `fetch_task` for `job` until a task is offered.
    ///
    /// A cookie on an `OK` response replaces the session cookie.
    pub(super) async fn acquire_task(
        &self,
        job: &Job,
        session: &mut Session,
    ) -> Result<TaskPoll, RunnerError> {
        let deadline = Instant::now() + self.cfg.job_timeout;
        let mut not_selected = 0u32;

        loop {
            self.checkpoint()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                info!(job_id = %job.id, timeout = ?self.cfg.job_timeout, "no task within budget");
                return Ok(TaskPoll::TimedOut);
            }

            debug!(job_id = %job.id, has_cookie = session.cookie.is_some(), "fetching task");
            let call = self.coordinator.fetch_task(&job.id, session.cookie.as_ref());
            let Ok(fetched) = tokio::time::timeout(remaining, call).await else {
                info!(job_id = %job.id, timeout = ?self.cfg.job_timeout, "task fetch outlived the budget");
                return Ok(TaskPoll::TimedOut);
            };
            self.checkpoint()?;

            let response = match fetched {
                Ok(response) => response,
                Err(e) => {
                    self.network_backoff(e, remaining).await?;
                    continue;
                }
            };

            match response.status.class() {
                StatusClass::Continue => {
                    if let Some(cookie) = response.cookie() {
                        session.cookie = Some(cookie);
                    }
                    return Ok(TaskPoll::Task(response.into_task()?));
                }
                StatusClass::Terminal => {
                    return Err(RunnerError::ServerStopped {
                        status: response.status.to_string(),
                        message: response.message,
                    });
                }
                StatusClass::LookForNewJob => {
                    info!(job_id = %job.id, "job has no more tasks");
                    return Ok(TaskPoll::NextJob);
                }
                StatusClass::RetryTask => {
                    let message = response.message.as_deref().unwrap_or_default();
                    if is_not_selected(message) {
                        not_selected += 1;
                        warn!(
                            attempt = not_selected,
                            max = self.cfg.max_not_selected_retries,
                            "device not selected"
                        );
                        self.metrics.retry(RetryReason::NotSelected);
                        if not_selected >= self.cfg.max_not_selected_retries {
                            warn!(job_id = %job.id, "device is not a participant, looking for another job");
                            return Ok(TaskPoll::NextJob);
                        }
                    } else {
                        not_selected = 0;
                        self.metrics.retry(RetryReason::TaskRetry);
                    }

                    let wait = self.retry_wait(response.retry_wait);
                    debug!(status = %response.status, reason = message, ?wait, "task not ready, retrying");
                    self.pause(wait.min(remaining)).await?;
                }
                StatusClass::Unknown => {
                    warn!(status = %response.status, "unexpected task status, retrying");
                    self.metrics.retry(RetryReason::Unknown);
                    self.pause(self.cfg.default_retry_wait.min(remaining)).await?;
                }
            }
        }
    }

    /// Wait out a retryable transport failure, or fail with it.
    async fn network_backoff(&self, e: ConnectError, remaining: Duration) -> Result<(), RunnerError> {
        if !e.is_retryable() {
            return Err(e.into());
        }
        warn!(error = %e, delay = ?self.cfg.network_retry_delay, "coordinator unreachable, retrying");
        self.metrics.retry(RetryReason::Network);
        self.pause(self.cfg.network_retry_delay.min(remaining)).await
    }

    pub(super) fn retry_wait(&self, hint_ms: Option<u64>) -> Duration {
        hint_ms
            .map(Duration::from_millis)
            .unwrap_or(self.cfg.default_retry_wait)
    }
}

fn is_not_selected(message: &str) -> bool {
    message.to_lowercase().contains(NOT_SELECTED)
}
