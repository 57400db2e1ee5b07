use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code carried by every coordinator response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Ok,
    Retry,
    NoTask,
    NoJob,
    Done,
    Error,
    Invalid,
    /// The coordinator is ending the relationship with this device.
    Stopped,
    /// Any code the runner does not know, kept verbatim for logging.
    Unknown(String),
}

/// What the runner does with a response, derived from its [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// End the session.
    Terminal,
    /// Current job is exhausted; go back to job acquisition.
    LookForNewJob,
    /// Wait `retry_wait` and reissue the same request.
    RetryTask,
    /// Proceed with the payload.
    Continue,
    /// Treated as [`StatusClass::RetryTask`] with the default wait.
    Unknown,
}

impl Status {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Status::Ok,
            "RETRY" => Status::Retry,
            "NO_TASK" => Status::NoTask,
            "NO_JOB" => Status::NoJob,
            "DONE" => Status::Done,
            "ERROR" => Status::Error,
            "INVALID" => Status::Invalid,
            "STOPPED" => Status::Stopped,
            _ => Status::Unknown(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Ok => "OK",
            Status::Retry => "RETRY",
            Status::NoTask => "NO_TASK",
            Status::NoJob => "NO_JOB",
            Status::Done => "DONE",
            Status::Error => "ERROR",
            Status::Invalid => "INVALID",
            Status::Stopped => "stopped",
            Status::Unknown(s) => s,
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            Status::Done | Status::Error | Status::Invalid | Status::Stopped => {
                StatusClass::Terminal
            }
            Status::NoJob => StatusClass::LookForNewJob,
            Status::Retry | Status::NoTask => StatusClass::RetryTask,
            Status::Ok => StatusClass::Continue,
            Status::Unknown(_) => StatusClass::Unknown,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.class() == StatusClass::Terminal
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Status::parse(&s)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
