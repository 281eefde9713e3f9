//! `ag-tensor` - Time-major tensors and batch items for autoregen.
//!
//! This crate provides:
//! - A `Tensor` type backed by CPU storage, laid out `[batch, time, ...]`
//! - A `ComputeBackend` trait with a reference `CpuBackend`
//! - `Device` selection with CPU fallback and the gradient-mode flag
//! - Host arrays and `BatchItem`s as served by data sources
//! - Mu-law companding

pub mod backend;
pub mod batch;
pub mod cpu;
pub mod device;
pub mod dtype;
pub mod error;
pub mod grad;
pub mod host;
pub mod mu_law;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use batch::{Batch, BatchItem};
pub use cpu::CpuBackend;
pub use device::Device;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use grad::{is_grad_enabled, set_grad_enabled, NoGradGuard};
pub use host::HostArray;
pub use shape::{Shape, TIME_AXIS};
pub use storage::CpuStorage;
pub use tensor::Tensor;
