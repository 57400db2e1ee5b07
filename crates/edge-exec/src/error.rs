use edge_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("no training method declared for the job")]
    MissingMethod,
    #[error("component registry missing from context")]
    MissingRegistry,
    #[error("dataset missing from context")]
    MissingDataset,
    #[error("cancelled")]
    Cancelled,
}

impl From<ExecError> for CoreError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Cancelled => CoreError::Aborted,
            other => CoreError::stage("trainer executor", other),
        }
    }
}
