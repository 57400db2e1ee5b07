//! Per-task pipeline: input filters → executor → output filters → result send.
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use edge_core::{
    Context, CoreError, Event, Executor, RetryReason, TaskOutcome, context::keys,
};
use edge_model::{Cookie, Dxo, Progress, Rounds, Status, Task};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{JobPlan, Session, SessionRunner};
use crate::RunnerError;

impl SessionRunner {
    pub(super) async fn process_task(
        &self,
        plan: &mut JobPlan,
        session: &Session,
        task: Task,
    ) -> Result<(), RunnerError> {
        let started = Instant::now();

        plan.current_round = task.round.unwrap_or(plan.current_round.saturating_add(1));
        if let Some(total) = task.total_rounds.filter(|t| *t > 0) {
            plan.total_rounds = total;
        }
        let rounds = Rounds::new(plan.current_round, plan.total_rounds);
        let job_id = plan.job.id.clone();

        info!(
            job_id = %job_id,
            task_id = %task.id,
            task = %task.name,
            round = rounds.current,
            total_rounds = rounds.total,
            "task received"
        );
        self.metrics.task_received(&task.name);
        self.emit(Progress::fetching_task(rounds).with_job(&job_id));
        self.emit(Progress::task_received(&task.name, rounds).with_job(&job_id));

        let task_name = task.name.clone();
        let result = self.run_pipeline(plan, session, task, rounds).await;

        let outcome = match &result {
            Ok(()) => TaskOutcome::Sent,
            Err(e) if e.is_aborted() => TaskOutcome::Aborted,
            Err(_) => TaskOutcome::Failed,
        };
        self.metrics
            .task_completed(&task_name, outcome, started.elapsed());
        result
    }

    async fn run_pipeline(
        &self,
        plan: &JobPlan,
        session: &Session,
        task: Task,
        rounds: Rounds,
    ) -> Result<(), RunnerError> {
        let executor = self.executor_for(plan, &task.name)?;

        let mut ctx = plan.ctx.clone();
        ctx.insert(keys::TASK_ID, task.id.as_str());
        ctx.insert(keys::TASK_NAME, task.name.as_str());
        ctx.insert(keys::TASK_DATA, task.data.clone().into_value());
        ctx.insert(keys::CURRENT_ROUND, rounds.current);
        ctx.insert(keys::TOTAL_ROUNDS, rounds.total);
        ctx.put_executor(Arc::clone(&executor));

        let input = plan
            .in_filters
            .apply("input filter", task.data, &ctx, &self.signal)
            .await?;
        self.checkpoint()?;

        self.emit(Progress::training(&task.name, rounds).with_job(&plan.job.id));
        let output = self.execute(&executor, input, &ctx).await?;
        self.checkpoint()?;

        let output = plan
            .out_filters
            .apply("output filter", output, &ctx, &self.signal)
            .await?;
        self.checkpoint()?;

        self.emit(Progress::sending_results(&task.name, rounds).with_job(&plan.job.id));
        let send_started = Instant::now();
        self.send_result(
            &plan.job.id,
            &task.id,
            &task.name,
            &output,
            session.cookie.as_ref(),
        )
        .await?;

        let elapsed = send_started.elapsed();
        info!(task = %task.name, round = rounds.current, ?elapsed, "results sent");
        self.metrics.result_sent(&task.name);
        self.emit(Progress::results_sent(rounds, elapsed).with_job(&plan.job.id));
        Ok(())
    }

    /// Executor configured for `task_name`, else the trainer executor of the job's method.
    fn executor_for(&self, plan: &JobPlan, task_name: &str) -> Result<Arc<dyn Executor>, RunnerError> {
        plan.resolved
            .find_executor(task_name)
            .or_else(|| plan.fallback.clone())
            .ok_or_else(|| CoreError::NoExecutor(task_name.to_string()).into())
    }

    /// Run the executor between the `before_train` and `after_train` events.
    async fn execute(
        &self,
        executor: &Arc<dyn Executor>,
        input: Dxo,
        ctx: &Context,
    ) -> Result<Dxo, RunnerError> {
        ctx.fire_event(&Event::before_train(now_ms()), &self.signal)
            .await;

        let output = executor
            .execute(input, ctx, &self.signal)
            .await
            .map_err(|e| e.in_stage("executor"))?;
        output.validate().map_err(|e| CoreError::Contract {
            stage: "executor".into(),
            reason: e.to_string(),
        })?;
        debug!(kind = %output.kind, "executor finished");

        ctx.fire_event(&Event::after_train(now_ms(), output.clone()), &self.signal)
            .await;
        Ok(output)
    }

    /// Send a result until the coordinator accepts it.
    ///
    /// `RETRY` re-sends after the hinted wait; transport failures are retried up to `max_result_attempts` attempts.
    async fn send_result(
        &self,
        job_id: &str,
        task_id: &str,
        task_name: &str,
        result: &Dxo,
        cookie: Option<&Cookie>,
    ) -> Result<(), RunnerError> {
        let mut failures = 0u32;

        loop {
            self.checkpoint()?;
            match self
                .coordinator
                .send_result(job_id, task_id, task_name, result, cookie)
                .await
            {
                Ok(response) => match response.status {
                    Status::Ok => return Ok(()),
                    Status::Retry => {
                        let wait = self.retry_wait(response.retry_wait);
                        debug!(task_id, ?wait, "result retry requested");
                        self.metrics.retry(RetryReason::ResultRetry);
                        self.pause(wait).await?;
                    }
                    other => {
                        return Err(RunnerError::ResultRejected {
                            status: other.to_string(),
                            message: response.message,
                        });
                    }
                },
                Err(e) if e.is_retryable() && failures + 1 < self.cfg.max_result_attempts => {
                    failures += 1;
                    warn!(
                        error = %e,
                        attempt = failures,
                        max = self.cfg.max_result_attempts,
                        "result send failed, retrying"
                    );
                    self.metrics.retry(RetryReason::Network);
                    self.pause(self.cfg.network_retry_delay).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
