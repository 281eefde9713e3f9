use ag_tensor::{BatchItem, Device, Tensor, TIME_AXIS};

use crate::error::{GenerateError, Result};

/// Brings a prompt into the loop's working representation.
///
/// Every array inside `item` is converted to a tensor, left-padded with unit
/// dimensions up to `min_rank`, moved to `device`, and extended with
/// `n_blanks` zero steps along the time axis. Tuples are processed
/// recursively; scalars and missing entries pass through untouched.
pub fn prepare_prompt(
    item: &BatchItem,
    device: Device,
    n_blanks: usize,
    min_rank: usize,
) -> Result<BatchItem> {
    Ok(match item {
        BatchItem::Tuple(items) => BatchItem::Tuple(
            items
                .iter()
                .map(|i| prepare_prompt(i, device, n_blanks, min_rank))
                .collect::<Result<_>>()?,
        ),
        BatchItem::Tensor(_) | BatchItem::Array(_) => {
            BatchItem::Tensor(prepare_tensor(item, device, n_blanks, min_rank)?)
        }
        BatchItem::Scalar(v) => BatchItem::Scalar(*v),
        BatchItem::Missing => BatchItem::Missing,
    })
}

/// [`prepare_prompt`] for a single slot, which must be array-like.
pub fn prepare_tensor(
    item: &BatchItem,
    device: Device,
    n_blanks: usize,
    min_rank: usize,
) -> Result<Tensor> {
    let mut prompt = match item {
        BatchItem::Tensor(t) => t.clone(),
        BatchItem::Array(a) => a.to_tensor()?,
        other => {
            return Err(GenerateError::PromptType(format!(
                "expected an array-like prompt, got {}",
                kind(other)
            )))
        }
    };
    while prompt.rank() < min_rank {
        prompt = prompt.unsqueeze(0)?;
    }
    let prompt = prompt.to_device(device);
    if n_blanks > 0 {
        Ok(prompt.pad_zeros(TIME_AXIS, n_blanks)?)
    } else {
        Ok(prompt)
    }
}

fn kind(item: &BatchItem) -> &'static str {
    match item {
        BatchItem::Tensor(_) => "tensor",
        BatchItem::Array(_) => "array",
        BatchItem::Tuple(_) => "tuple",
        BatchItem::Scalar(_) => "scalar",
        BatchItem::Missing => "missing entry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_tensor::{HostArray, Shape};

    fn prompt(t: usize) -> BatchItem {
        BatchItem::Tensor(Tensor::full(Shape::new(vec![2, t, 3]), 1.0))
    }

    #[test]
    fn test_no_blanks_keeps_time_length() {
        let out = prepare_tensor(&prompt(5), Device::Cpu, 0, 3).unwrap();
        assert_eq!(out.shape().dims(), &[2, 5, 3]);
    }

    #[test]
    fn test_blanks_extend_time_length() {
        let out = prepare_tensor(&prompt(5), Device::Cpu, 4, 3).unwrap();
        assert_eq!(out.shape().dims(), &[2, 9, 3]);
        assert!(out.narrow(TIME_AXIS, 5, 4).unwrap().data_f32().iter().all(|&v| v == 0.0));
        assert!(out.narrow(TIME_AXIS, 0, 5).unwrap().data_f32().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_rank_padding_and_device() {
        let item = BatchItem::Array(HostArray::I64 {
            data: vec![3, 4],
            shape: Shape::new(vec![2]),
        });
        let out = prepare_tensor(&item, Device::Cuda(0), 1, 2).unwrap();
        assert_eq!(out.shape().dims(), &[1, 3]);
        assert_eq!(out.data_f32(), &[3.0, 4.0, 0.0]);
        assert_eq!(out.device(), Device::Cuda(0));
    }

    #[test]
    fn test_nested_prompt() {
        let item = BatchItem::Tuple(vec![prompt(2), BatchItem::Scalar(0.1), BatchItem::Missing]);
        let BatchItem::Tuple(out) = prepare_prompt(&item, Device::Cpu, 2, 3).unwrap() else {
            panic!("expected tuple");
        };
        assert_eq!(out[0].as_tensor().unwrap().time_len().unwrap(), 4);
        assert_eq!(out[1], BatchItem::Scalar(0.1));
        assert_eq!(out[2], BatchItem::Missing);
    }

    #[test]
    fn test_non_array_slot_is_type_error() {
        let err = prepare_tensor(&BatchItem::Scalar(1.0), Device::Cpu, 0, 2).unwrap_err();
        assert!(matches!(err, GenerateError::PromptType(_)));
    }
}
