use crate::dtype::DType;

/// CPU-side tensor storage.
///
/// Computation happens in F32 only; other element types are converted when a
/// host array becomes a tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuStorage {
    /// 32-bit floating point storage.
    F32(Vec<f32>),
}

impl CpuStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the data as an f32 slice.
    pub fn as_f32_slice(&self) -> &[f32] {
        match self {
            CpuStorage::F32(v) => v.as_slice(),
        }
    }

    /// Returns the data as a mutable f32 slice.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        match self {
            CpuStorage::F32(v) => v.as_mut_slice(),
        }
    }

    /// Create zero-filled F32 storage with `n` elements.
    pub fn zeros(n: usize) -> Self {
        CpuStorage::F32(vec![0.0; n])
    }

    /// Create storage from an f32 vector.
    pub fn from_f32_vec(data: Vec<f32>) -> Self {
        CpuStorage::F32(data)
    }

    /// Consumes the storage, returning the owned f32 values.
    pub fn into_f32_vec(self) -> Vec<f32> {
        match self {
            CpuStorage::F32(v) => v,
        }
    }

    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f32_vec() {
        let s = CpuStorage::from_f32_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
        assert_eq!(s.as_f32_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(s.dtype(), DType::F32);
    }

    #[test]
    fn test_zeros() {
        let s = CpuStorage::zeros(4);
        assert_eq!(s.into_f32_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_mut_slice() {
        let mut s = CpuStorage::from_f32_vec(vec![1.0, 2.0]);
        s.as_f32_slice_mut()[0] = 42.0;
        assert_eq!(s.as_f32_slice()[0], 42.0);
    }
}
