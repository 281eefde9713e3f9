use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("invalid axis {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },
    #[error("range {start}..{end} out of bounds for axis {axis} of size {size}")]
    OutOfRange {
        axis: usize,
        start: usize,
        end: usize,
        size: usize,
    },
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(String),
    #[error("unknown device: {0:?}")]
    UnknownDevice(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
