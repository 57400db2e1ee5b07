mod acquire;
mod task;

#[cfg(test)]
mod tests;

use std::{sync::Arc, time::Duration};

use edge_connect::Coordinator;
use edge_core::{
    ComponentArgs, ComponentRegistry, Context, CoreError, DataSource, Executor, Filter,
    FilterChain, JobConfig, MetricsBackend, NoopMetrics, NoopProgress, ProgressSink,
    ResolvedJob, SharedCapabilities, Signal, context::keys,
};
use edge_model::{Cookie, Job, Progress};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{RunnerConfig, RunnerError, RunnerHandle, SessionOutcome};

use acquire::TaskPoll;

/// Drives one federated-learning session against a coordinator.
///
/// Runs a job loop, a task loop per job and the per-task pipeline sequentially; at most one task is in flight.
/// Stop it through a [`RunnerHandle`].
pub struct SessionRunner {
    cfg: RunnerConfig,
    coordinator: Arc<dyn Coordinator>,
    registry: Arc<ComponentRegistry>,
    data_source: Arc<dyn DataSource>,
    in_filters: FilterChain,
    out_filters: FilterChain,
    progress: Arc<dyn ProgressSink>,
    metrics: Arc<dyn MetricsBackend>,
    capabilities: SharedCapabilities,
    signal: Signal,
}

/// Runner-owned mutable state of one `run()`, dropped when it returns.
#[derive(Debug, Default)]
struct Session {
    cookie: Option<Cookie>,
}

/// Everything resolved for the job currently being worked on.
struct JobPlan {
    job: Job,
    resolved: ResolvedJob,
    /// Trainer executor for the job's method, used when no executor matches the task name.
    fallback: Option<Arc<dyn Executor>>,
    in_filters: FilterChain,
    out_filters: FilterChain,
    ctx: Context,
    current_round: u32,
    total_rounds: u32,
}

enum JobEnd {
    /// Go back to job acquisition.
    NextJob,
    /// Job or task search ran out of budget.
    TimedOut,
}

impl SessionRunner {
    pub fn builder(
        cfg: RunnerConfig,
        coordinator: Arc<dyn Coordinator>,
        data_source: Arc<dyn DataSource>,
    ) -> RunnerBuilder {
        RunnerBuilder {
            cfg,
            coordinator,
            data_source,
            registry: ComponentRegistry::new(),
            in_filters: FilterChain::new(),
            out_filters: FilterChain::new(),
            progress: Arc::new(NoopProgress),
            metrics: Arc::new(NoopMetrics),
            methods: None,
        }
    }

    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle::new(self.signal.clone(), self.capabilities.clone())
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Run the session until the coordinator ends it, the budget runs out, a fatal error occurs or the runner is stopped.
    pub async fn run(&self) -> SessionOutcome {
        info!(
            job = %self.cfg.job_name,
            endpoint = self.coordinator.endpoint(),
            "session started"
        );
        let mut session = Session::default();

        let outcome = loop {
            if self.signal.is_triggered() {
                self.emit(Progress::stopping());
                break SessionOutcome::Stopped;
            }
            match self.run_job(&mut session).await {
                Ok(JobEnd::NextJob) => {
                    debug!("looking for a new job");
                    continue;
                }
                Ok(JobEnd::TimedOut) => {
                    self.emit(Progress::completed());
                    break SessionOutcome::Completed;
                }
                Err(e) if e.is_aborted() || self.signal.is_triggered() => {
                    self.emit(Progress::stopping());
                    break SessionOutcome::Stopped;
                }
                Err(e @ RunnerError::ServerStopped { .. }) => {
                    info!(reason = %e, "session ended by coordinator");
                    self.emit(Progress::completed());
                    break SessionOutcome::Completed;
                }
                Err(e) => {
                    error!(error = %e, "session failed");
                    self.emit(Progress::error(e.to_string(), format!("{e:?}")));
                    break SessionOutcome::Failed(e.to_string());
                }
            }
        };

        self.metrics.session_end(outcome.as_str());
        info!(outcome = %outcome, "session finished");
        outcome
    }

    async fn run_job(&self, session: &mut Session) -> Result<JobEnd, RunnerError> {
        let mut ctx = Context::new();
        ctx.put_data_source(Arc::clone(&self.data_source));
        ctx.put_registry(Arc::clone(&self.registry));
        ctx.insert(keys::JOB_NAME, self.cfg.job_name.as_str());

        self.emit(Progress::connecting(self.coordinator.endpoint()));

        let dataset = self
            .data_source
            .dataset(&self.cfg.job_name, &ctx)
            .map_err(|e| match e {
                CoreError::Dataset { .. } => e,
                other => CoreError::Dataset {
                    job: self.cfg.job_name.clone(),
                    reason: other.to_string(),
                },
            })?;
        let dataset_size = dataset.size();
        ctx.put_dataset(dataset);
        debug!(dataset_size, "dataset ready");
        self.emit(Progress::fetching_job(dataset_size));

        let started = Instant::now();
        let Some(job) = self.acquire_job().await? else {
            return Ok(JobEnd::TimedOut);
        };
        info!(job_id = %job.id, job = %job.name, "job received");
        self.metrics.job_received(&job.name);
        self.emit(Progress::job_received(&job.id, &job.name, started.elapsed()));

        let mut plan = self.plan_job(job, ctx)?;
        loop {
            let task = match self.acquire_task(&plan.job, session).await? {
                TaskPoll::Task(task) => task,
                TaskPoll::NextJob => return Ok(JobEnd::NextJob),
                TaskPoll::TimedOut => return Ok(JobEnd::TimedOut),
            };
            self.process_task(&mut plan, session, task).await?;
        }
    }

    /// Resolve the job configuration into executors, filters and handlers.
    fn plan_job(&self, job: Job, mut ctx: Context) -> Result<JobPlan, RunnerError> {
        let mut cfg = JobConfig::from_job_data(&job.data, &job.name)?;
        if cfg.method.is_none() {
            cfg.method = job.method.clone();
        }
        let resolved = cfg.resolve(&self.registry)?;

        let fallback = match resolved.method.as_deref() {
            Some(method) if self.registry.has_trainer(method) => {
                let mut args = ComponentArgs::new();
                args.insert("method".into(), Value::String(method.to_string()));
                args.insert("job_name".into(), Value::String(job.name.clone()));
                let executor = self
                    .registry
                    .resolve(edge_exec::TRAINER_EXECUTOR, &args)?
                    .into_executor(edge_exec::TRAINER_EXECUTOR)?;
                Some(executor)
            }
            Some(method) => {
                warn!(method, "no trainer registered for declared method");
                None
            }
            None => None,
        };

        ctx.insert(keys::JOB_ID, job.id.as_str());
        ctx.insert(keys::JOB_NAME, job.name.as_str());
        if let Some(method) = &resolved.method {
            ctx.insert(keys::METHOD, method.as_str());
        }
        ctx.put_handlers(Arc::clone(&resolved.handlers));

        let in_filters = self.in_filters.concat(&resolved.in_filters);
        let out_filters = self.out_filters.concat(&resolved.out_filters);
        debug!(
            job_id = %job.id,
            method = ?resolved.method,
            executors = resolved.executors.len(),
            in_filters = in_filters.len(),
            out_filters = out_filters.len(),
            handlers = resolved.handlers.len(),
            "job planned"
        );

        Ok(JobPlan {
            job,
            resolved,
            fallback,
            in_filters,
            out_filters,
            ctx,
            current_round: 0,
            total_rounds: 0,
        })
    }

    fn emit(&self, progress: Progress) {
        self.progress.on_progress(&progress);
    }

    /// Fail with [`RunnerError::Aborted`] once the runner was stopped.
    fn checkpoint(&self) -> Result<(), RunnerError> {
        if self.signal.is_triggered() {
            return Err(RunnerError::Aborted);
        }
        Ok(())
    }

    /// Sleep for `wait`, ending early when the runner is stopped.
    async fn pause(&self, wait: Duration) -> Result<(), RunnerError> {
        tokio::select! {
            _ = self.signal.cancelled() => Err(RunnerError::Aborted),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

/// Builder for [`SessionRunner`].
pub struct RunnerBuilder {
    cfg: RunnerConfig,
    coordinator: Arc<dyn Coordinator>,
    data_source: Arc<dyn DataSource>,
    registry: ComponentRegistry,
    in_filters: FilterChain,
    out_filters: FilterChain,
    progress: Arc<dyn ProgressSink>,
    metrics: Arc<dyn MetricsBackend>,
    methods: Option<Vec<String>>,
}

impl RunnerBuilder {
    /// Host components and trainers; they extend or replace the built-ins by name.
    pub fn registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Input filter applied to every task before the job's own input filters.
    pub fn in_filter(mut self, label: impl Into<String>, filter: Arc<dyn Filter>) -> Self {
        self.in_filters.push(label, filter);
        self
    }

    /// Output filter applied to every result before the job's own output filters.
    pub fn out_filter(mut self, label: impl Into<String>, filter: Arc<dyn Filter>) -> Self {
        self.out_filters.push(label, filter);
        self
    }

    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Advertised methods; defaults to every registered trainer method.
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<SessionRunner, RunnerError> {
        self.cfg.validate()?;

        let mut registry = edge_exec::builtin_registry();
        registry.merge(&self.registry);

        let capabilities = match self.methods {
            Some(methods) => SharedCapabilities::new(methods),
            None => SharedCapabilities::new(registry.trainer_methods()),
        };
        debug!(
            components = ?registry.component_types(),
            methods = ?capabilities.snapshot(),
            "runner built"
        );

        Ok(SessionRunner {
            cfg: self.cfg,
            coordinator: self.coordinator,
            registry: Arc::new(registry),
            data_source: self.data_source,
            in_filters: self.in_filters,
            out_filters: self.out_filters,
            progress: self.progress,
            metrics: self.metrics,
            capabilities,
            signal: Signal::new(),
        })
    }
}
