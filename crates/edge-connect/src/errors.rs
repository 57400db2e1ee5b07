use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("coordinator rejected request ({status}): {body}")]
    InvalidRequest { status: u16, body: String },

    #[error("coordinator refused credentials ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("coordinator failed ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid connection config: {0}")]
    InvalidConfig(String),
}

impl ConnectError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ConnectError::Auth { status, body },
            500..=599 => ConnectError::Server { status, body },
            _ => ConnectError::InvalidRequest { status, body },
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConnectError::Timeout
        } else {
            ConnectError::Transport(e)
        }
    }

    /// Connection-level failures worth another attempt; everything else ends the session.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectError::Transport(_) | ConnectError::Timeout)
    }
}
