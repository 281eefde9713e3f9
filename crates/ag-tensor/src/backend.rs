use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable compute backends.
///
/// Kernels work on f32 slices laid out as consecutive rows of `n` values.
/// Data is passed in as slices and returned as owned vectors.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Scalar multiplication: result[i] = a[i] * s.
    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>>;

    /// Softmax over each row of `n` elements.
    fn softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>>;

    /// Index of the largest element of each row of `n` elements.
    fn argmax(&self, x: &[f32], n: usize) -> Result<Vec<usize>>;
}
