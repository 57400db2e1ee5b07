use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Running,
    Stopped,
}

/// A job assigned to this device by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    /// Declared training method, if the coordinator sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// Opaque job configuration.
    #[serde(default)]
    pub data: Map<String, Value>,
}
