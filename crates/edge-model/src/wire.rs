//! JSON messages exchanged with the coordinator.
//!
//! Responses are permissive: every field except `status` is optional, and conversion into [`Job`]/[`Task`] is where missing data turns into a [`ModelError`].
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Capabilities, Cookie, Dxo, Job, JobStatus, ModelError, Status, Task};

/// Body of `POST /job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_name: String,
    pub capabilities: Capabilities,
}

/// Response of `POST /job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    /// Milliseconds to wait before polling again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_wait: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobResponse {
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            job_id: None,
            job_name: None,
            job_data: None,
            method: None,
            meta: None,
            retry_wait: None,
            message: None,
        }
    }

    /// Turn an `OK` response into a [`Job`].
    ///
    /// `requested_name` is used when the coordinator does not echo the job name.
    pub fn into_job(self, requested_name: &str) -> Result<Job, ModelError> {
        let id = self
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or(ModelError::MissingField {
                context: "job response",
                field: "job_id",
            })?;

        let meta = self.meta.unwrap_or_default();
        let method = self.method.or_else(|| {
            meta.get("method")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Ok(Job {
            id,
            name: self
                .job_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| requested_name.to_string()),
            status: JobStatus::Running,
            method,
            meta,
            data: self.job_data.unwrap_or_default(),
        })
    }
}

/// Body of `POST /task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,
}

/// Response of `POST /task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_wait: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskResponse {
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            job_id: None,
            task_id: None,
            task_name: None,
            task_data: None,
            cookie: None,
            retry_wait: None,
            message: None,
        }
    }

    /// The cookie carried by this response, if any.
    pub fn cookie(&self) -> Option<Cookie> {
        Cookie::from_response(self.cookie.clone())
    }

    /// Turn an `OK` response into a [`Task`].
    pub fn into_task(self) -> Result<Task, ModelError> {
        let cookie = self.cookie();
        let id = self.task_id.filter(|s| !s.is_empty()).ok_or(ModelError::MissingField {
            context: "task response",
            field: "task_id",
        })?;
        let name = self
            .task_name
            .filter(|s| !s.is_empty())
            .ok_or(ModelError::MissingField {
                context: "task response",
                field: "task_name",
            })?;
        let data = self.task_data.ok_or(ModelError::MissingField {
            context: "task response",
            field: "task_data",
        })?;

        Ok(Task::new(id, name, Dxo::from_value(data)?).with_cookie(cookie))
    }
}

/// Body of `POST /result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRequest {
    pub job_id: String,
    pub task_id: String,
    pub task_name: String,
    pub result: Dxo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,
}

/// Response of `POST /result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_wait: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultResponse {
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            retry_wait: None,
            message: None,
        }
    }
}
