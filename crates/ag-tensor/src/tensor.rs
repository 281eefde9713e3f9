use crate::device::Device;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::{Shape, TIME_AXIS};
use crate::storage::CpuStorage;

/// A tensor backed by CPU storage.
///
/// Holds contiguous, row-major f32 data with an associated shape and the
/// device it is logically placed on. Batched signals are laid out
/// `[batch, time, features...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: CpuStorage,
    shape: Shape,
    device: Device,
}

impl Tensor {
    /// Create a new tensor from f32 data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {:?} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape,
            device: Device::Cpu,
        }
    }

    /// Fallible variant of [`Tensor::new`].
    pub fn from_vec(data: Vec<f32>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor::new(data, shape))
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Tensor {
            storage: CpuStorage::zeros(shape.numel()),
            shape,
            device: Device::Cpu,
        }
    }

    /// Create a tensor where every element equals `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let n = shape.numel();
        Tensor::new(vec![value; n], shape)
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Shorthand for `shape().ndim()`.
    pub fn rank(&self) -> usize {
        self.shape.ndim()
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Returns the device the tensor is placed on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns the underlying data as an f32 slice.
    pub fn data_f32(&self) -> &[f32] {
        self.storage.as_f32_slice()
    }

    /// Returns the underlying data as a mutable f32 slice.
    pub fn data_f32_mut(&mut self) -> &mut [f32] {
        self.storage.as_f32_slice_mut()
    }

    /// Consumes the tensor, returning its row-major values.
    pub fn into_vec(self) -> Vec<f32> {
        self.storage.into_f32_vec()
    }

    /// Returns the underlying storage reference.
    pub fn storage(&self) -> &CpuStorage {
        &self.storage
    }

    /// Length of the time axis.
    pub fn time_len(&self) -> Result<usize> {
        self.shape.time_len().ok_or(TensorError::InvalidAxis {
            axis: TIME_AXIS,
            ndim: self.rank(),
        })
    }

    /// Returns the same values placed on `device`.
    pub fn to_device(&self, device: Device) -> Tensor {
        Tensor {
            storage: self.storage.clone(),
            shape: self.shape.clone(),
            device,
        }
    }

    /// Reshape the tensor, returning a new tensor with the same data but
    /// a different shape.
    ///
    /// The total number of elements must remain the same.
    pub fn reshape(&self, new_shape: Shape) -> Result<Tensor> {
        if self.shape.numel() != new_shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            storage: self.storage.clone(),
            shape: new_shape,
            device: self.device,
        })
    }

    /// Inserts a unit dimension at `axis`.
    pub fn unsqueeze(&self, axis: usize) -> Result<Tensor> {
        let shape = self.shape.insert_unit(axis)?;
        self.reshape(shape)
    }

    /// Applies `f` to every element.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        let data = self.data_f32().iter().map(|&v| f(v)).collect();
        Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape: self.shape.clone(),
            device: self.device,
        }
    }

    /// Returns the sub-tensor `start..start+len` along `axis`.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Tensor> {
        let (outer, size, inner) = self.shape.split_at_axis(axis)?;
        if start + len > size {
            return Err(TensorError::OutOfRange {
                axis,
                start,
                end: start + len,
                size,
            });
        }

        let src = self.data_f32();
        let mut data = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let offset = o * size * inner + start * inner;
            data.extend_from_slice(&src[offset..offset + len * inner]);
        }

        Ok(Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape: self.shape.with_dim(axis, len)?,
            device: self.device,
        })
    }

    /// Concatenates tensors along `axis`.
    ///
    /// All tensors must share rank, device, and every dimension except
    /// `axis`.
    pub fn cat(tensors: &[&Tensor], axis: usize) -> Result<Tensor> {
        let first = tensors
            .first()
            .ok_or_else(|| TensorError::Other("cat of zero tensors".to_string()))?;
        first.shape.check_axis(axis)?;

        let mut total = 0;
        for t in tensors {
            if t.device != first.device {
                return Err(TensorError::Other(format!(
                    "cat: device mismatch ({} vs {})",
                    first.device, t.device
                )));
            }
            let same_rank = t.rank() == first.rank();
            let compatible = same_rank
                && t.shape
                    .dims()
                    .iter()
                    .zip(first.shape.dims())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::ShapeMismatch {
                    expected: first.shape.dims().to_vec(),
                    got: t.shape.dims().to_vec(),
                });
            }
            total += t.shape.dim(axis);
        }

        let shape = first.shape.with_dim(axis, total)?;
        let (outer, _, inner) = shape.split_at_axis(axis)?;
        let mut data = Vec::with_capacity(shape.numel());
        for o in 0..outer {
            for t in tensors {
                let block = t.shape.dim(axis) * inner;
                data.extend_from_slice(&t.data_f32()[o * block..(o + 1) * block]);
            }
        }

        Ok(Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape,
            device: first.device,
        })
    }

    /// Appends `n` zero-valued entries along `axis`.
    pub fn pad_zeros(&self, axis: usize, n: usize) -> Result<Tensor> {
        if n == 0 {
            self.shape.check_axis(axis)?;
            return Ok(self.clone());
        }
        let zeros = Tensor::zeros(self.shape.with_dim(axis, n)?).to_device(self.device);
        Tensor::cat(&[self, &zeros], axis)
    }

    /// Overwrites `start..start+src.dim(axis)` along `axis` with `src`.
    ///
    /// `src` must match this tensor in every other dimension.
    pub fn assign(&mut self, axis: usize, start: usize, src: &Tensor) -> Result<()> {
        let (outer, size, inner) = self.shape.split_at_axis(axis)?;
        let compatible = src.rank() == self.rank()
            && src
                .shape
                .dims()
                .iter()
                .zip(self.shape.dims())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !compatible {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: src.shape.dims().to_vec(),
            });
        }
        let len = src.shape.dim(axis);
        if start + len > size {
            return Err(TensorError::OutOfRange {
                axis,
                start,
                end: start + len,
                size,
            });
        }

        let block = len * inner;
        let values = src.data_f32();
        let dst = self.storage.as_f32_slice_mut();
        for o in 0..outer {
            let offset = o * size * inner + start * inner;
            dst[offset..offset + block].copy_from_slice(&values[o * block..(o + 1) * block]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> Tensor {
        let shape = Shape::from_slice(shape);
        let data = (0..shape.numel()).map(|v| v as f32).collect();
        Tensor::new(data, shape)
    }

    #[test]
    fn test_new_tensor() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::new(vec![2, 3]));
        assert_eq!(t.rank(), 2);
        assert_eq!(t.time_len().unwrap(), 3);
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.device(), Device::Cpu);
        assert_eq!(t.data_f32(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic]
    fn test_new_shape_mismatch_panics() {
        let _t = Tensor::new(vec![1.0, 2.0], Shape::new(vec![3]));
    }

    #[test]
    fn test_from_vec_mismatch() {
        assert!(Tensor::from_vec(vec![1.0, 2.0], Shape::new(vec![3])).is_err());
    }

    #[test]
    fn test_time_len_requires_rank_two() {
        assert!(arange(&[4]).time_len().is_err());
    }

    #[test]
    fn test_reshape_and_unsqueeze() {
        let t = arange(&[6]);
        assert_eq!(t.reshape(Shape::new(vec![2, 3])).unwrap().shape().dims(), &[2, 3]);
        assert!(t.reshape(Shape::new(vec![4])).is_err());
        assert_eq!(t.unsqueeze(0).unwrap().shape().dims(), &[1, 6]);
    }

    #[test]
    fn test_narrow_time() {
        let t = arange(&[2, 4]);
        let n = t.narrow(1, 1, 2).unwrap();
        assert_eq!(n.shape().dims(), &[2, 2]);
        assert_eq!(n.data_f32(), &[1.0, 2.0, 5.0, 6.0]);
        assert!(t.narrow(1, 3, 2).is_err());
    }

    #[test]
    fn test_narrow_with_features() {
        let t = arange(&[1, 3, 2]);
        let n = t.narrow(1, 2, 1).unwrap();
        assert_eq!(n.data_f32(), &[4.0, 5.0]);
    }

    #[test]
    fn test_cat_time() {
        let a = arange(&[2, 2]);
        let b = Tensor::full(Shape::new(vec![2, 1]), 9.0);
        let c = Tensor::cat(&[&a, &b], 1).unwrap();
        assert_eq!(c.shape().dims(), &[2, 3]);
        assert_eq!(c.data_f32(), &[0.0, 1.0, 9.0, 2.0, 3.0, 9.0]);
    }

    #[test]
    fn test_cat_mismatch() {
        let a = arange(&[2, 2]);
        let b = arange(&[3, 2]);
        assert!(Tensor::cat(&[&a, &b], 1).is_err());
        assert!(Tensor::cat(&[], 0).is_err());
    }

    #[test]
    fn test_pad_zeros() {
        let t = arange(&[1, 2, 2]);
        let p = t.pad_zeros(1, 2).unwrap();
        assert_eq!(p.shape().dims(), &[1, 4, 2]);
        assert_eq!(p.data_f32(), &[0.0, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(t.pad_zeros(1, 0).unwrap(), t);
    }

    #[test]
    fn test_assign() {
        let mut t = Tensor::zeros(Shape::new(vec![2, 4]));
        let v = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![2, 2]));
        t.assign(1, 1, &v).unwrap();
        assert_eq!(t.data_f32(), &[0.0, 1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0]);
        assert!(t.assign(1, 3, &v).is_err());
        let wrong = Tensor::zeros(Shape::new(vec![3, 1]));
        assert!(t.assign(1, 0, &wrong).is_err());
    }

    #[test]
    fn test_to_device_keeps_values() {
        let t = arange(&[2, 2]);
        let moved = t.to_device(Device::Cuda(0));
        assert_eq!(moved.device(), Device::Cuda(0));
        assert_eq!(moved.data_f32(), t.data_f32());
    }

    #[test]
    fn test_map() {
        let t = arange(&[3]).map(|v| v * 2.0);
        assert_eq!(t.data_f32(), &[0.0, 2.0, 4.0]);
    }
}
