use crate::device::Device;
use crate::error::Result;
use crate::host::HostArray;
use crate::tensor::Tensor;

/// One feature of a batch as served by a data source.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItem {
    /// A tensor, already in the runtime's representation.
    Tensor(Tensor),
    /// A raw host array still to be converted.
    Array(HostArray),
    /// A structured feature made of several items.
    Tuple(Vec<BatchItem>),
    /// A plain number travelling with the batch.
    Scalar(f64),
    /// No data for this position.
    Missing,
}

/// An ordered sequence of per-feature items, batch-major and time-major.
pub type Batch = Vec<BatchItem>;

impl BatchItem {
    /// Returns the tensor if this item is one.
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            BatchItem::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Returns true for tensors and host arrays.
    pub fn is_array_like(&self) -> bool {
        matches!(self, BatchItem::Tensor(_) | BatchItem::Array(_))
    }

    /// Moves every array inside this item to `device`, converting host arrays
    /// to tensors on the way. Scalars and missing entries are left untouched.
    pub fn to_device(&self, device: Device) -> Result<BatchItem> {
        Ok(match self {
            BatchItem::Tensor(t) => BatchItem::Tensor(t.to_device(device)),
            BatchItem::Array(a) => BatchItem::Tensor(a.to_tensor()?.to_device(device)),
            BatchItem::Tuple(items) => BatchItem::Tuple(
                items
                    .iter()
                    .map(|item| item.to_device(device))
                    .collect::<Result<_>>()?,
            ),
            BatchItem::Scalar(v) => BatchItem::Scalar(*v),
            BatchItem::Missing => BatchItem::Missing,
        })
    }
}

impl From<Tensor> for BatchItem {
    fn from(t: Tensor) -> Self {
        BatchItem::Tensor(t)
    }
}

impl From<HostArray> for BatchItem {
    fn from(a: HostArray) -> Self {
        BatchItem::Array(a)
    }
}
