use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("sampler configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SamplerError>;
