use std::fmt;

use edge_core::{SharedCapabilities, Signal};
use edge_model::Capabilities;
use serde_json::Value;
use tracing::info;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The coordinator ended the session or no job arrived within the budget.
    Completed,
    /// The host stopped the runner.
    Stopped,
    Failed(String),
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Stopped => "stopped",
            SessionOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Host-side control of a running session. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    signal: Signal,
    capabilities: SharedCapabilities,
}

impl RunnerHandle {
    pub(crate) fn new(signal: Signal, capabilities: SharedCapabilities) -> Self {
        Self {
            signal,
            capabilities,
        }
    }

    /// Ask the runner to stop. Returns `false` if it was already stopped.
    pub fn stop(&self, reason: Option<&str>) -> bool {
        let first = self.signal.trigger(reason.map(|r| Value::String(r.to_string())));
        if first {
            info!(reason = reason.unwrap_or("-"), "stop requested");
        }
        first
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_triggered()
    }

    /// Reason given to the first [`stop`](Self::stop), if any.
    pub fn stop_reason(&self) -> Option<&str> {
        self.signal.payload().and_then(Value::as_str)
    }

    pub fn toggle_method(&self, method: &str) -> bool {
        self.capabilities.toggle(method)
    }

    pub fn enable_method(&self, method: &str) {
        self.capabilities.enable(method);
    }

    pub fn disable_method(&self, method: &str) {
        self.capabilities.disable(method);
    }

    pub fn set_methods<I, S>(&self, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.set(methods);
    }

    /// Methods advertised on the next job request.
    pub fn methods(&self) -> Capabilities {
        self.capabilities.snapshot()
    }
}
