use edge_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown component type: {0}")]
    UnknownComponent(String),

    #[error("component {name} is not a {expected}")]
    WrongCapability { name: String, expected: &'static str },

    #[error("invalid args for {name}: {reason}")]
    InvalidArgs { name: String, reason: String },

    #[error("invalid job config: {0}")]
    InvalidConfig(String),

    #[error("cannot find executor for task {0}")]
    NoExecutor(String),

    #[error("no trainer registered for method {0}")]
    NoTrainer(String),

    #[error("dataset for job {job} unavailable: {reason}")]
    Dataset { job: String, reason: String },

    #[error("{stage} returned an invalid dxo: {reason}")]
    Contract { stage: String, reason: String },

    #[error("{stage} failed: {reason}")]
    Stage { stage: String, reason: String },

    #[error("aborted")]
    Aborted,

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CoreError {
    /// Shorthand for a component failure.
    pub fn stage(stage: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CoreError::Stage {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }

    /// Attribute a component failure to `stage`.
    ///
    /// Aborts and errors that already name their stage pass through unchanged.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        match self {
            CoreError::Aborted | CoreError::Stage { .. } | CoreError::Contract { .. } => self,
            other => CoreError::stage(stage, other),
        }
    }
}
