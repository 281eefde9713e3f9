use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("prompt type error: {0}")]
    PromptType(String),
    #[error("interface error: {0}")]
    Interface(String),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tensor error: {0}")]
    TensorError(#[from] ag_tensor::TensorError),
    #[error("model error: {0}")]
    ModelError(#[from] ag_model::ModelError),
    #[error("data error: {0}")]
    DataError(#[from] ag_data::DataError),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
