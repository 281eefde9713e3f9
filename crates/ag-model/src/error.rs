use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    #[error("type mismatch for parameter '{key}': expected {expected}, got {got}")]
    ParameterType {
        key: String,
        expected: String,
        got: String,
    },
    #[error("expected {expected} inputs, got {got}")]
    InputArity { expected: usize, got: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("tensor error: {0}")]
    TensorError(#[from] ag_tensor::TensorError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
