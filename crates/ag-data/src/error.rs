use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed signal file: {0}")]
    Malformed(String),
    #[error("prompt length {prompt_length} does not fit a signal of {len} samples")]
    PromptTooLong { prompt_length: usize, len: usize },
    #[error("read {start}..{end} out of range for a signal of {len} samples")]
    OutOfRange { start: usize, end: usize, len: usize },
    #[error("sampler error: {0}")]
    SamplerError(#[from] ag_sampler::SamplerError),
    #[error("tensor error: {0}")]
    TensorError(#[from] ag_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, DataError>;
