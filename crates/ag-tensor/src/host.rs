use half::f16;

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// A raw array produced outside the runtime, before it becomes a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostArray {
    F32 { data: Vec<f32>, shape: Shape },
    F16 { data: Vec<f16>, shape: Shape },
    I64 { data: Vec<i64>, shape: Shape },
}

impl HostArray {
    pub fn shape(&self) -> &Shape {
        match self {
            HostArray::F32 { shape, .. }
            | HostArray::F16 { shape, .. }
            | HostArray::I64 { shape, .. } => shape,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostArray::F32 { .. } => DType::F32,
            HostArray::F16 { .. } => DType::F16,
            HostArray::I64 { .. } => DType::I64,
        }
    }

    fn len(&self) -> usize {
        match self {
            HostArray::F32 { data, .. } => data.len(),
            HostArray::F16 { data, .. } => data.len(),
            HostArray::I64 { data, .. } => data.len(),
        }
    }

    /// Converts the array into an F32 tensor on the CPU.
    pub fn to_tensor(&self) -> Result<Tensor> {
        if self.len() != self.shape().numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().dims().to_vec(),
                got: vec![self.len()],
            });
        }
        let data = match self {
            HostArray::F32 { data, .. } => data.clone(),
            HostArray::F16 { data, .. } => data.iter().map(|v| v.to_f32()).collect(),
            HostArray::I64 { data, .. } => data.iter().map(|&v| v as f32).collect(),
        };
        Tensor::from_vec(data, self.shape().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f16_conversion() {
        let array = HostArray::F16 {
            data: vec![f16::from_f32(0.5), f16::from_f32(-1.0)],
            shape: Shape::new(vec![1, 2]),
        };
        assert_eq!(array.dtype(), DType::F16);
        let t = array.to_tensor().unwrap();
        assert_eq!(t.data_f32(), &[0.5, -1.0]);
    }

    #[test]
    fn test_i64_conversion() {
        let array = HostArray::I64 {
            data: vec![0, 127, 255],
            shape: Shape::new(vec![3]),
        };
        assert_eq!(array.to_tensor().unwrap().data_f32(), &[0.0, 127.0, 255.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let array = HostArray::F32 {
            data: vec![1.0],
            shape: Shape::new(vec![2]),
        };
        assert!(array.to_tensor().is_err());
    }
}
