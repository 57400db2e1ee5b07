use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("missing field in {context}: {field}")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
    #[error("malformed dxo: {0}")]
    MalformedDxo(String),
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}
