use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_rows(op: &str, x: &[f32], n: usize) -> Result<usize> {
    if n == 0 {
        return Err(TensorError::Other(format!("{}: row size must be > 0", op)));
    }
    if x.len() % n != 0 {
        return Err(TensorError::Other(format!(
            "{}: x.len()={} is not a multiple of n={}",
            op,
            x.len(),
            n
        )));
    }
    Ok(x.len() / n)
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>> {
        Ok(a.iter().map(|x| x * s).collect())
    }

    fn softmax(&self, x: &[f32], n: usize) -> Result<Vec<f32>> {
        let n_rows = check_rows("softmax", x, n)?;
        let mut result = vec![0.0f32; x.len()];

        for row in 0..n_rows {
            let offset = row * n;
            let row_data = &x[offset..offset + n];

            // Subtract the max for numerical stability.
            let max_val = row_data.iter().copied().fold(f32::NEG_INFINITY, f32::max);

            let mut sum = 0.0f32;
            for i in 0..n {
                let e = (row_data[i] - max_val).exp();
                result[offset + i] = e;
                sum += e;
            }
            for v in &mut result[offset..offset + n] {
                *v /= sum;
            }
        }

        Ok(result)
    }

    fn argmax(&self, x: &[f32], n: usize) -> Result<Vec<usize>> {
        let n_rows = check_rows("argmax", x, n)?;
        Ok((0..n_rows)
            .map(|row| {
                let row_data = &x[row * n..(row + 1) * n];
                row_data
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                        if v > best.1 {
                            (i, v)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect())
    }
}
