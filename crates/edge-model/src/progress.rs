use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session phase reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    FetchingJob,
    JobReceived,
    FetchingTask,
    TaskReceived,
    Training,
    SendingResults,
    ResultsSent,
    Stopping,
    Completed,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Connecting => "connecting",
            Phase::FetchingJob => "fetching_job",
            Phase::JobReceived => "job_received",
            Phase::FetchingTask => "fetching_task",
            Phase::TaskReceived => "task_received",
            Phase::Training => "training",
            Phase::SendingResults => "sending_results",
            Phase::ResultsSent => "results_sent",
            Phase::Stopping => "stopping",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }

    /// Returns `true` for phases after which the session emits nothing else.
    pub fn is_final(&self) -> bool {
        matches!(self, Phase::Stopping | Phase::Completed | Phase::Error)
    }
}

/// Round position of the current task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rounds {
    pub current: u32,
    /// Zero while unknown.
    pub total: u32,
}

impl Rounds {
    pub fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }
}

/// One progress record delivered to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub phase: Phase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(default)]
    pub rounds: Rounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Progress {
    fn bare(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            job_id: None,
            job_name: None,
            task_name: None,
            rounds: Rounds::default(),
            duration_ms: None,
            server_url: None,
            dataset_size: None,
            error: None,
        }
    }

    pub fn connecting(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            server_url: Some(server_url.clone()),
            ..Self::bare(Phase::Connecting, format!("connecting to {server_url}"))
        }
    }

    pub fn fetching_job(dataset_size: usize) -> Self {
        Self {
            dataset_size: Some(dataset_size),
            ..Self::bare(Phase::FetchingJob, "looking for a job")
        }
    }

    pub fn job_received(job_id: &str, job_name: &str, duration: Duration) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            job_name: Some(job_name.to_string()),
            duration_ms: Some(duration.as_millis() as u64),
            ..Self::bare(Phase::JobReceived, format!("job {job_id} received"))
        }
    }

    pub fn fetching_task(rounds: Rounds) -> Self {
        Self {
            rounds,
            ..Self::bare(Phase::FetchingTask, "fetching task")
        }
    }

    pub fn task_received(task_name: &str, rounds: Rounds) -> Self {
        Self {
            task_name: Some(task_name.to_string()),
            rounds,
            ..Self::bare(Phase::TaskReceived, format!("task {task_name} received"))
        }
    }

    pub fn training(task_name: &str, rounds: Rounds) -> Self {
        Self {
            task_name: Some(task_name.to_string()),
            rounds,
            ..Self::bare(Phase::Training, format!("running {task_name}"))
        }
    }

    pub fn sending_results(task_name: &str, rounds: Rounds) -> Self {
        Self {
            task_name: Some(task_name.to_string()),
            rounds,
            ..Self::bare(Phase::SendingResults, "sending results")
        }
    }

    pub fn results_sent(rounds: Rounds, duration: Duration) -> Self {
        Self {
            rounds,
            duration_ms: Some(duration.as_millis() as u64),
            ..Self::bare(Phase::ResultsSent, "results accepted")
        }
    }

    pub fn stopping() -> Self {
        Self::bare(Phase::Stopping, "stopping")
    }

    pub fn completed() -> Self {
        Self::bare(Phase::Completed, "session completed")
    }

    pub fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: Some(details.into()),
            ..Self::bare(Phase::Error, message)
        }
    }

    pub fn with_job(mut self, job_id: &str) -> Self {
        self.job_id = Some(job_id.to_string());
        self
    }
}
