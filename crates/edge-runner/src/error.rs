use edge_connect::ConnectError;
use edge_core::CoreError;
use edge_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid coordinator payload: {0}")]
    Model(#[from] ModelError),

    #[error("coordinator ended the session with {status}{}", message_suffix(.message))]
    ServerStopped {
        status: String,
        message: Option<String>,
    },

    #[error("coordinator rejected result with {status}{}", message_suffix(.message))]
    ResultRejected {
        status: String,
        message: Option<String>,
    },

    #[error("invalid runner config: {0}")]
    InvalidConfig(String),

    #[error("stopped")]
    Aborted,
}

impl RunnerError {
    /// The session was stopped by the host rather than failing.
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunnerError::Aborted | RunnerError::Core(CoreError::Aborted))
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {m}"),
        _ => String::new(),
    }
}
