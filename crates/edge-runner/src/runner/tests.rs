use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use edge_connect::{ConnectError, Coordinator};
use edge_core::{
    Batch, ComponentRegistry, Context, CoreError, DataSource, Dataset, Event, EventHandler,
    Executor, Filter, ProgressFn, ProgressSink, Signal, Trainer,
};
use edge_model::{
    Capabilities, Cookie, Dxo, Phase, Progress, Rounds, Status,
    wire::{JobResponse, ResultResponse, TaskResponse},
};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::{RunnerConfig, SessionOutcome, SessionRunner};

#[derive(Debug, Clone)]
enum Call {
    Job {
        at: Instant,
        methods: Capabilities,
    },
    Task {
        at: Instant,
        cookie: Option<Value>,
    },
    Result {
        task_id: String,
        result: Dxo,
        cookie: Option<Value>,
    },
}

/// Coordinator answering from pre-scripted queues.
///
/// An exhausted job or task queue answers `job_default`/`DONE`; an exhausted result queue answers `OK`.
#[derive(Default)]
struct Scripted {
    jobs: Mutex<VecDeque<Result<JobResponse, ConnectError>>>,
    tasks: Mutex<VecDeque<Result<TaskResponse, ConnectError>>>,
    results: Mutex<VecDeque<Result<ResultResponse, ConnectError>>>,
    job_default: Option<JobResponse>,
    /// Time each `fetch_job` takes before answering.
    job_latency: Duration,
    /// Time each `fetch_task` takes before answering.
    task_latency: Duration,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    fn new() -> Self {
        Self::default()
    }

    fn job(self, r: JobResponse) -> Self {
        self.jobs.lock().unwrap().push_back(Ok(r));
        self
    }

    fn job_err(self, e: ConnectError) -> Self {
        self.jobs.lock().unwrap().push_back(Err(e));
        self
    }

    fn task(self, r: TaskResponse) -> Self {
        self.tasks.lock().unwrap().push_back(Ok(r));
        self
    }

    fn task_err(self, e: ConnectError) -> Self {
        self.tasks.lock().unwrap().push_back(Err(e));
        self
    }

    fn result(self, r: ResultResponse) -> Self {
        self.results.lock().unwrap().push_back(Ok(r));
        self
    }

    fn result_err(self, e: ConnectError) -> Self {
        self.results.lock().unwrap().push_back(Err(e));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn job_calls(&self) -> Vec<(Instant, Capabilities)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Job { at, methods } => Some((at, methods)),
                _ => None,
            })
            .collect()
    }

    fn task_calls(&self) -> Vec<(Instant, Option<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Task { at, cookie } => Some((at, cookie)),
                _ => None,
            })
            .collect()
    }

    fn result_calls(&self) -> Vec<(String, Dxo, Option<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Result {
                    task_id,
                    result,
                    cookie,
                } => Some((task_id, result, cookie)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Coordinator for Scripted {
    fn endpoint(&self) -> &str {
        "scripted://coordinator"
    }

    async fn fetch_job(
        &self,
        _job_name: &str,
        capabilities: &Capabilities,
    ) -> Result<JobResponse, ConnectError> {
        tokio::time::sleep(self.job_latency).await;
        self.calls.lock().unwrap().push(Call::Job {
            at: Instant::now(),
            methods: capabilities.clone(),
        });
        self.jobs.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(self
                .job_default
                .clone()
                .unwrap_or_else(|| JobResponse::with_status(Status::Done)))
        })
    }

    async fn fetch_task(
        &self,
        _job_id: &str,
        cookie: Option<&Cookie>,
    ) -> Result<TaskResponse, ConnectError> {
        tokio::time::sleep(self.task_latency).await;
        self.calls.lock().unwrap().push(Call::Task {
            at: Instant::now(),
            cookie: cookie.map(|c| c.as_value().clone()),
        });
        self.tasks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TaskResponse::with_status(Status::Done)))
    }

    async fn send_result(
        &self,
        _job_id: &str,
        task_id: &str,
        _task_name: &str,
        result: &Dxo,
        cookie: Option<&Cookie>,
    ) -> Result<ResultResponse, ConnectError> {
        self.calls.lock().unwrap().push(Call::Result {
            task_id: task_id.to_string(),
            result: result.clone(),
            cookie: cookie.map(|c| c.as_value().clone()),
        });
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultResponse::with_status(Status::Ok)))
    }
}

fn job_ok(id: &str, data: Value) -> JobResponse {
    let mut r = JobResponse::with_status(Status::Ok);
    r.job_id = Some(id.to_string());
    r.job_data = data.as_object().cloned();
    r
}

fn job_retry(wait_ms: u64) -> JobResponse {
    let mut r = JobResponse::with_status(Status::Retry);
    r.retry_wait = Some(wait_ms);
    r
}

fn task_ok(id: &str, meta: Value) -> TaskResponse {
    let mut r = TaskResponse::with_status(Status::Ok);
    r.task_id = Some(id.to_string());
    r.task_name = Some("train".to_string());
    r.task_data = Some(json!({"kind": "WEIGHTS", "data": {"w": [0.1, 0.2]}, "meta": meta}));
    r
}

fn task_with_cookie(id: &str, cookie: Value) -> TaskResponse {
    let mut r = task_ok(id, json!({}));
    r.cookie = Some(cookie);
    r
}

fn task_retry(wait_ms: Option<u64>, message: &str) -> TaskResponse {
    let mut r = TaskResponse::with_status(Status::Retry);
    r.retry_wait = wait_ms;
    r.message = Some(message.to_string());
    r
}

fn any_task_identity() -> Value {
    json!({"executors": {"*": {"type": "Executor.Identity"}}})
}

struct Identity;

#[async_trait]
impl Executor for Identity {
    async fn execute(&self, input: Dxo, _: &Context, _: &Signal) -> Result<Dxo, CoreError> {
        Ok(input)
    }
}

/// Triggers the stop signal while "training".
struct StopsMidway;

#[async_trait]
impl Executor for StopsMidway {
    async fn execute(&self, input: Dxo, _: &Context, signal: &Signal) -> Result<Dxo, CoreError> {
        signal.trigger(Some(json!("host")));
        Ok(input)
    }
}

struct Broken;

#[async_trait]
impl Executor for Broken {
    async fn execute(&self, _: Dxo, _: &Context, _: &Signal) -> Result<Dxo, CoreError> {
        Ok(Dxo::new(""))
    }
}

struct Diverging;

#[async_trait]
impl Executor for Diverging {
    async fn execute(&self, _: Dxo, _: &Context, _: &Signal) -> Result<Dxo, CoreError> {
        Err(CoreError::stage("trainer", "loss diverged"))
    }
}

struct Mark(String);

#[async_trait]
impl Filter for Mark {
    async fn filter(&self, input: Dxo, _: &Context, _: &Signal) -> Result<Dxo, CoreError> {
        let trail = format!(
            "{}{}",
            input.meta.get("trail").and_then(Value::as_str).unwrap_or(""),
            self.0
        );
        Ok(input.with_meta("trail", trail))
    }
}

struct Recorder(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl EventHandler for Recorder {
    async fn handle_event(&self, event: &Event, ctx: &Context, _: &Signal) {
        let task = ctx.text(edge_core::context::keys::TASK_NAME).unwrap_or("-");
        self.0
            .lock()
            .unwrap()
            .push(format!("{}:{task}", event.kind.as_str()));
    }
}

struct Counting;

#[async_trait]
impl Trainer for Counting {
    async fn train(
        &self,
        _input: Dxo,
        dataset: Arc<dyn Dataset>,
        _: &Context,
        _: &Signal,
    ) -> Result<Dxo, CoreError> {
        Ok(Dxo::new("WEIGHT_DIFF").with_data("samples", dataset.size()))
    }
}

struct Samples(usize);

impl Dataset for Samples {
    fn size(&self) -> usize {
        self.0
    }
    fn next_batch(&self, _batch_size: usize) -> Option<Batch> {
        None
    }
    fn reset(&self) {}
}

struct Source {
    fail: bool,
}

impl DataSource for Source {
    fn dataset(&self, job_name: &str, _: &Context) -> Result<Arc<dyn Dataset>, CoreError> {
        if self.fail {
            return Err(CoreError::Dataset {
                job: job_name.to_string(),
                reason: "no data on device".into(),
            });
        }
        Ok(Arc::new(Samples(8)))
    }
}

fn host_registry() -> ComponentRegistry {
    let mut reg = ComponentRegistry::new();
    reg.register_executor("Executor.Identity", |_| Ok(Arc::new(Identity) as Arc<dyn Executor>));
    reg.register_executor("Executor.StopsMidway", |_| {
        Ok(Arc::new(StopsMidway) as Arc<dyn Executor>)
    });
    reg.register_executor("Executor.Broken", |_| Ok(Arc::new(Broken) as Arc<dyn Executor>));
    reg.register_executor("Executor.Diverging", |_| {
        Ok(Arc::new(Diverging) as Arc<dyn Executor>)
    });
    reg.register_filter("Filter.Mark", |args| {
        let mark = args.get("mark").and_then(Value::as_str).unwrap_or("?");
        Ok(Arc::new(Mark(mark.to_string())) as Arc<dyn Filter>)
    });
    reg.register_trainer("cnn", |_| Ok(Arc::new(Counting) as Arc<dyn Trainer>));
    reg
}

struct Harness {
    coordinator: Arc<Scripted>,
    progress: Arc<Mutex<Vec<Progress>>>,
    runner: SessionRunner,
}

impl Harness {
    fn new(coordinator: Scripted) -> Self {
        Self::with(coordinator, RunnerConfig::new("mnist"), |b| b)
    }

    fn with(
        coordinator: Scripted,
        cfg: RunnerConfig,
        customize: impl FnOnce(crate::RunnerBuilder) -> crate::RunnerBuilder,
    ) -> Self {
        let coordinator = Arc::new(coordinator);
        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let progress = Arc::clone(&progress);
            ProgressFn(move |p: &Progress| progress.lock().unwrap().push(p.clone()))
        };

        let builder = SessionRunner::builder(
            cfg,
            Arc::clone(&coordinator) as Arc<dyn Coordinator>,
            Arc::new(Source { fail: false }),
        )
        .registry(host_registry())
        .progress(Arc::new(sink) as Arc<dyn ProgressSink>);

        let runner = customize(builder).build().unwrap();
        Self {
            coordinator,
            progress,
            runner,
        }
    }

    fn phases(&self) -> Vec<Phase> {
        self.progress.lock().unwrap().iter().map(|p| p.phase).collect()
    }

    fn last_progress(&self) -> Progress {
        self.progress.lock().unwrap().last().cloned().unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn single_round_with_identity_executor() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({"contribution_round": 1, "num_rounds": 3}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    let results = h.coordinator.result_calls();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "t1");
    assert_eq!(results[0].1.kind, "WEIGHTS");
    assert_eq!(results[0].1.data["w"], json!([0.1, 0.2]));

    assert_eq!(
        h.phases(),
        vec![
            Phase::Connecting,
            Phase::FetchingJob,
            Phase::JobReceived,
            Phase::FetchingTask,
            Phase::TaskReceived,
            Phase::Training,
            Phase::SendingResults,
            Phase::ResultsSent,
            Phase::Completed,
        ]
    );
    let sent = h
        .progress
        .lock()
        .unwrap()
        .iter()
        .find(|p| p.phase == Phase::ResultsSent)
        .cloned()
        .unwrap();
    assert_eq!(sent.rounds, Rounds::new(1, 3));
    assert_eq!(sent.job_id.as_deref(), Some("j1"));
}

#[tokio::test(start_paused = true)]
async fn terminal_task_status_ends_session_without_further_calls() {
    for status in [Status::Done, Status::Error, Status::Invalid] {
        let h = Harness::new(
            Scripted::new()
                .job(job_ok("j1", any_task_identity()))
                .task(TaskResponse::with_status(status.clone())),
        );

        assert_eq!(h.runner.run().await, SessionOutcome::Completed, "{status}");
        assert_eq!(h.coordinator.calls().len(), 2, "{status}");
        assert!(h.coordinator.result_calls().is_empty());
        assert_eq!(h.last_progress().phase, Phase::Completed);
    }
}

#[tokio::test(start_paused = true)]
async fn server_stop_on_job_fetch_completes() {
    let h = Harness::new(Scripted::new().job(JobResponse::with_status(Status::parse("stopped"))));
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(h.coordinator.job_calls().len(), 1);
    assert!(h.coordinator.task_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_job_returns_to_job_acquisition() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(TaskResponse::with_status(Status::NoJob)),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let kinds: Vec<&str> = h
        .coordinator
        .calls()
        .iter()
        .map(|c| match c {
            Call::Job { .. } => "job",
            Call::Task { .. } => "task",
            Call::Result { .. } => "result",
        })
        .collect();
    assert_eq!(kinds, vec!["job", "task", "job"]);
}

#[tokio::test(start_paused = true)]
async fn task_retry_waits_and_cookie_is_forwarded_verbatim() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_with_cookie("t1", json!({"sid": 1, "nested": [true]})))
            .task(task_retry(Some(200), "waiting for peers"))
            .task(task_with_cookie("t2", json!("opaque-2"))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    let tasks = h.coordinator.task_calls();
    assert_eq!(tasks.len(), 4);
    assert_eq!(tasks[0].1, None);
    assert_eq!(tasks[1].1, Some(json!({"sid": 1, "nested": [true]})));
    assert_eq!(tasks[2].1, tasks[1].1);
    assert_eq!(tasks[3].1, Some(json!("opaque-2")));
    assert!(tasks[2].0 - tasks[1].0 >= Duration::from_millis(200));

    let results = h.coordinator.result_calls();
    assert_eq!(results[0].2, Some(json!({"sid": 1, "nested": [true]})));
    assert_eq!(results[1].2, Some(json!("opaque-2")));
}

#[tokio::test(start_paused = true)]
async fn task_retry_without_hint_waits_default() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(TaskResponse::with_status(Status::NoTask)),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let tasks = h.coordinator.task_calls();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[1].0 - tasks[0].0 >= Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn unknown_task_status_is_retried() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(TaskResponse::with_status(Status::parse("LATER")))
            .task(task_ok("t1", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(h.coordinator.result_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn not_selected_ten_times_looks_for_new_job() {
    let mut script = Scripted::new().job(job_ok("j1", any_task_identity()));
    for _ in 0..10 {
        script = script.task(task_retry(Some(10), "Device not selected"));
    }
    let h = Harness::new(script);

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(h.coordinator.task_calls().len(), 10);
    assert_eq!(h.coordinator.job_calls().len(), 2);
    assert!(h.coordinator.result_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn other_retry_reason_resets_not_selected_counter() {
    let mut script = Scripted::new().job(job_ok("j1", any_task_identity()));
    for _ in 0..9 {
        script = script.task(task_retry(Some(10), "device NOT SELECTED yet"));
    }
    script = script.task(task_retry(Some(10), "busy"));
    for _ in 0..9 {
        script = script.task(task_retry(Some(10), "device not selected"));
    }
    let h = Harness::new(script);

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    // 19 retries plus the final DONE, all within the same job.
    assert_eq!(h.coordinator.task_calls().len(), 20);
    assert_eq!(h.coordinator.job_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn job_search_respects_timeout() {
    let script = Scripted {
        job_default: Some(job_retry(1000)),
        ..Scripted::new()
    };
    let cfg = RunnerConfig::new("mnist").with_job_timeout(Duration::from_secs(3));
    let h = Harness::with(script, cfg, |b| b);

    let started = Instant::now();
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    assert!(started.elapsed() <= Duration::from_secs(3));
    assert_eq!(h.coordinator.job_calls().len(), 3);
    assert_eq!(h.last_progress().phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn slow_job_fetch_cannot_outlive_budget() {
    let script = Scripted {
        job_latency: Duration::from_secs(30),
        ..Scripted::new()
    };
    let cfg = RunnerConfig::new("mnist").with_job_timeout(Duration::from_secs(1));
    let h = Harness::with(script, cfg, |b| b);

    let started = Instant::now();
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    assert!(started.elapsed() <= Duration::from_secs(1), "{:?}", started.elapsed());
    assert!(h.coordinator.task_calls().is_empty());
    assert_eq!(h.last_progress().phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn slow_task_fetch_cannot_outlive_budget() {
    let script = Scripted {
        task_latency: Duration::from_secs(30),
        ..Scripted::new().job(job_ok("j1", any_task_identity()))
    };
    let cfg = RunnerConfig::new("mnist").with_job_timeout(Duration::from_secs(1));
    let h = Harness::with(script, cfg, |b| b);

    let started = Instant::now();
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    assert!(started.elapsed() <= Duration::from_secs(1), "{:?}", started.elapsed());
    assert!(h.coordinator.result_calls().is_empty());
    assert_eq!(h.last_progress().phase, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn job_retry_honors_retry_wait() {
    let h = Harness::new(
        Scripted::new()
            .job(job_retry(200))
            .job(job_ok("j1", any_task_identity())),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let jobs = h.coordinator.job_calls();
    assert!(jobs[1].0 - jobs[0].0 >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn cookie_does_not_outlive_its_run() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .job(job_ok("j2", any_task_identity()))
            .task(task_with_cookie("t1", json!({"session": "s-1"})))
            .task(TaskResponse::with_status(Status::Done))
            .task(task_ok("t2", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    let cookies: Vec<Option<Value>> = h
        .coordinator
        .task_calls()
        .into_iter()
        .map(|(_, c)| c)
        .collect();
    assert_eq!(cookies, vec![None, Some(json!({"session": "s-1"})), None, None]);
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_wait_without_sending() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_retry(Some(60_000), "waiting")),
    );
    let handle = h.runner.handle();

    let started = Instant::now();
    let (outcome, _) = tokio::join!(h.runner.run(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop(Some("user"));
    });

    assert_eq!(outcome, SessionOutcome::Stopped);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(h.coordinator.task_calls().len(), 1);
    assert!(h.coordinator.result_calls().is_empty());
    assert_eq!(h.last_progress().phase, Phase::Stopping);
    assert_eq!(handle.stop_reason(), Some("user"));
}

#[tokio::test(start_paused = true)]
async fn stop_during_execution_skips_result_send() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok(
                "j1",
                json!({"executors": {"train": {"type": "Executor.StopsMidway"}}}),
            ))
            .task(task_ok("t1", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Stopped);
    assert!(h.coordinator.result_calls().is_empty());
    assert_eq!(h.last_progress().phase, Phase::Stopping);
}

#[tokio::test(start_paused = true)]
async fn stopped_before_run_performs_no_io() {
    let h = Harness::new(Scripted::new().job(job_ok("j1", any_task_identity())));
    h.runner.handle().stop(None);

    assert_eq!(h.runner.run().await, SessionOutcome::Stopped);
    assert!(h.coordinator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn result_retry_resends_after_wait() {
    let mut retry = ResultResponse::with_status(Status::Retry);
    retry.retry_wait = Some(100);
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({})))
            .result(retry),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(h.coordinator.result_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn result_transport_failures_are_bounded() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({})))
            .result_err(ConnectError::Timeout)
            .result_err(ConnectError::Timeout)
            .result_err(ConnectError::Timeout),
    );

    let outcome = h.runner.run().await;
    assert!(matches!(outcome, SessionOutcome::Failed(_)), "{outcome}");
    assert_eq!(h.coordinator.result_calls().len(), 3);
    assert_eq!(h.last_progress().phase, Phase::Error);
}

#[tokio::test(start_paused = true)]
async fn rejected_result_fails_session() {
    let mut invalid = ResultResponse::with_status(Status::Invalid);
    invalid.message = Some("stale round".into());
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({})))
            .result(invalid),
    );

    match h.runner.run().await {
        SessionOutcome::Failed(reason) => assert!(reason.contains("stale round"), "{reason}"),
        other => panic!("unexpected outcome {other}"),
    }
    assert_eq!(h.last_progress().phase, Phase::Error);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_during_task_fetch_is_retried() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task_err(ConnectError::Timeout)
            .task(task_ok("t1", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let tasks = h.coordinator.task_calls();
    assert!(tasks[1].0 - tasks[0].0 >= Duration::from_millis(5000));
    assert_eq!(h.coordinator.result_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_is_fatal() {
    let h = Harness::new(Scripted::new().job_err(ConnectError::Auth {
        status: 401,
        body: "denied".into(),
    }));

    assert!(matches!(h.runner.run().await, SessionOutcome::Failed(_)));
    assert_eq!(h.coordinator.job_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn global_filters_run_before_job_filters() {
    let job_data = json!({
        "executors": {"*": {"type": "Executor.Identity"}},
        "in_filters": [{"type": "Filter.Mark", "args": {"mark": "j"}}],
        "out_filters": [{"type": "Filter.Mark", "args": {"mark": "o"}}]
    });
    let h = Harness::with(
        Scripted::new()
            .job(job_ok("j1", job_data))
            .task(task_ok("t1", json!({}))),
        RunnerConfig::new("mnist"),
        |b| {
            b.in_filter("global-in", Arc::new(Mark("g".into())))
                .out_filter("global-out", Arc::new(Mark("G".into())))
        },
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let results = h.coordinator.result_calls();
    assert_eq!(results[0].1.meta["trail"], "gjGo");
}

#[tokio::test(start_paused = true)]
async fn events_fire_around_execution() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = host_registry();
    {
        let seen = Arc::clone(&seen);
        registry.register_handler("EventHandler.Recorder", move |_| {
            Ok(Arc::new(Recorder(Arc::clone(&seen))) as Arc<dyn EventHandler>)
        });
    }
    let job_data = json!({
        "components": [{"name": "rec", "type": "EventHandler.Recorder"}],
        "executors": {"*": {"type": "Executor.Identity"}},
        "handlers": ["@rec", "EventHandler.NoOpEventHandler"]
    });
    let h = Harness::with(
        Scripted::new()
            .job(job_ok("j1", job_data))
            .task(task_ok("t1", json!({}))),
        RunnerConfig::new("mnist"),
        |b| b.registry(registry),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    assert_eq!(*seen.lock().unwrap(), vec!["before_train:train", "after_train:train"]);
}

#[tokio::test(start_paused = true)]
async fn malformed_executor_output_is_fatal() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", json!({"executors": {"*": {"type": "Executor.Broken"}}})))
            .task(task_ok("t1", json!({}))),
    );

    match h.runner.run().await {
        SessionOutcome::Failed(reason) => assert!(reason.contains("executor"), "{reason}"),
        other => panic!("unexpected outcome {other}"),
    }
    assert!(h.coordinator.result_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn executor_failure_is_reported_as_is() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", json!({"executors": {"*": {"type": "Executor.Diverging"}}})))
            .task(task_ok("t1", json!({}))),
    );

    match h.runner.run().await {
        SessionOutcome::Failed(reason) => {
            assert!(reason.contains("trainer failed: loss diverged"), "{reason}");
            assert!(!reason.contains("invalid dxo"), "{reason}");
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert!(h.coordinator.result_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_executor_is_fatal() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", json!({"executors": {"validate": {"type": "Executor.Identity"}}})))
            .task(task_ok("t1", json!({}))),
    );

    match h.runner.run().await {
        SessionOutcome::Failed(reason) => assert!(reason.contains("train"), "{reason}"),
        other => panic!("unexpected outcome {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn unknown_component_in_job_config_is_fatal() {
    let h = Harness::new(
        Scripted::new().job(job_ok("j1", json!({"in_filters": [{"type": "Filter.Ghost"}]}))),
    );

    assert!(matches!(h.runner.run().await, SessionOutcome::Failed(_)));
    assert!(h.coordinator.task_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn declared_method_falls_back_to_trainer() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", json!({"config": "{\"method\": \"cnn\"}"})))
            .task(task_ok("t1", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let results = h.coordinator.result_calls();
    assert_eq!(results[0].1.kind, "WEIGHT_DIFF");
    assert_eq!(results[0].1.data["samples"], 8);
}

#[tokio::test(start_paused = true)]
async fn dataset_failure_ends_session_before_polling() {
    let coordinator = Arc::new(Scripted::new().job(job_ok("j1", any_task_identity())));
    let runner = SessionRunner::builder(
        RunnerConfig::new("mnist"),
        Arc::clone(&coordinator) as Arc<dyn Coordinator>,
        Arc::new(Source { fail: true }),
    )
    .build()
    .unwrap();

    match runner.run().await {
        SessionOutcome::Failed(reason) => assert!(reason.contains("no data on device"), "{reason}"),
        other => panic!("unexpected outcome {other}"),
    }
    assert!(coordinator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rounds_fall_back_to_local_counter() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({"num_rounds": 0})))
            .task(task_ok("t2", json!({"num_rounds": 5})))
            .task(task_ok("t3", json!({"contribution_round": 7}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let rounds: Vec<Rounds> = h
        .progress
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p.phase == Phase::ResultsSent)
        .map(|p| p.rounds)
        .collect();
    assert_eq!(
        rounds,
        vec![Rounds::new(1, 0), Rounds::new(2, 5), Rounds::new(7, 5)]
    );
}

#[tokio::test(start_paused = true)]
async fn round_counter_saturates_at_max() {
    let h = Harness::new(
        Scripted::new()
            .job(job_ok("j1", any_task_identity()))
            .task(task_ok("t1", json!({"contribution_round": u32::MAX})))
            .task(task_ok("t2", json!({}))),
    );

    assert_eq!(h.runner.run().await, SessionOutcome::Completed);
    let rounds: Vec<u32> = h
        .progress
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p.phase == Phase::ResultsSent)
        .map(|p| p.rounds.current)
        .collect();
    assert_eq!(rounds, vec![u32::MAX, u32::MAX]);
}

#[tokio::test(start_paused = true)]
async fn capabilities_default_to_trainer_methods_and_follow_toggles() {
    let h = Harness::new(Scripted::new());
    let handle = h.runner.handle();
    assert_eq!(handle.methods(), Capabilities::new(["cnn"]));

    handle.enable_method("xgb");
    assert_eq!(h.runner.run().await, SessionOutcome::Completed);

    let jobs = h.coordinator.job_calls();
    assert_eq!(jobs[0].1, Capabilities::new(["cnn", "xgb"]));
}

#[tokio::test(start_paused = true)]
async fn explicit_methods_override_trainer_table() {
    let h = Harness::with(Scripted::new(), RunnerConfig::new("mnist"), |b| {
        b.methods(["svm"])
    });
    assert_eq!(h.runner.handle().methods(), Capabilities::new(["svm"]));
}

#[test]
fn builder_rejects_invalid_config() {
    let result = SessionRunner::builder(
        RunnerConfig::default(),
        Arc::new(Scripted::new()),
        Arc::new(Source { fail: false }),
    )
    .build();
    assert!(result.is_err());
}
