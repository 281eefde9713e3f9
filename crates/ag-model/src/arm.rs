use ag_tensor::{Batch, Device, Tensor};

use crate::error::Result;
use crate::params::Parameters;

/// Mode and placement state shared by every network.
pub trait Network {
    /// Returns true while the network is in training mode.
    fn is_training(&self) -> bool;

    /// Switch between training (`true`) and evaluation (`false`) mode.
    fn set_training(&mut self, training: bool);

    /// The device holding the network's parameters.
    fn device(&self) -> Device;

    /// Move the network's parameters and state to `device`.
    fn to_device(&mut self, device: Device) -> Result<()>;
}

/// Trait for autoregressive models (ARMs) that a generation loop can drive
/// step by step.
///
/// A run over one batch goes through `before_generate`, any number of
/// `generate_step` calls with increasing `t`, then `after_generate`. The next
/// batch starts over with `before_generate`.
pub trait Arm: Network {
    /// Receptive field: the number of trailing input steps needed to produce
    /// one output step.
    fn shift(&self) -> usize {
        0
    }

    /// Reset per-run state (recurrent hidden state, RNG, caches) before
    /// stepping through `batch`.
    fn before_generate(&mut self, batch: &Batch, batch_index: usize) -> Result<()>;

    /// Produce the values for absolute step `t`.
    ///
    /// `inputs` holds one tensor per active input slot, each already
    /// windowed to what the slot's reader exposes at `t`. The result holds
    /// one optional value per output slot; `None` means nothing is written
    /// for that slot at this step, which is how networks running at a coarser
    /// rate than the loop skip steps.
    fn generate_step(
        &mut self,
        inputs: &[Tensor],
        t: usize,
        params: &Parameters,
    ) -> Result<StepOutputs>;

    /// Post-process the accumulated output buffers (e.g. decode a quantized
    /// representation) before they reach the caller.
    fn after_generate(&mut self, outputs: Vec<Tensor>, batch_index: usize) -> Result<Vec<Tensor>> {
        let _ = batch_index;
        Ok(outputs)
    }
}

/// The values returned by one [`Arm::generate_step`] call, one per output
/// slot in declared order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutputs(Vec<Option<Tensor>>);

impl StepOutputs {
    pub fn new(values: Vec<Option<Tensor>>) -> Self {
        StepOutputs(values)
    }

    /// A step that writes nothing to any of `n` output slots.
    pub fn skip(n: usize) -> Self {
        StepOutputs(vec![None; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Tensor>> {
        self.0.iter().map(Option::as_ref)
    }

    pub fn into_inner(self) -> Vec<Option<Tensor>> {
        self.0
    }
}

/// A single returned tensor is a one-slot output.
impl From<Tensor> for StepOutputs {
    fn from(t: Tensor) -> Self {
        StepOutputs(vec![Some(t)])
    }
}

impl From<Option<Tensor>> for StepOutputs {
    fn from(t: Option<Tensor>) -> Self {
        StepOutputs(vec![t])
    }
}

impl From<Vec<Tensor>> for StepOutputs {
    fn from(values: Vec<Tensor>) -> Self {
        StepOutputs(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<Tensor>>> for StepOutputs {
    fn from(values: Vec<Option<Tensor>>) -> Self {
        StepOutputs(values)
    }
}

impl IntoIterator for StepOutputs {
    type Item = Option<Tensor>;
    type IntoIter = std::vec::IntoIter<Option<Tensor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_tensor::Shape;

    #[test]
    fn test_single_tensor_is_one_slot() {
        let out = StepOutputs::from(Tensor::zeros(Shape::new(vec![1, 1])));
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|v| v.is_some()));
    }

    #[test]
    fn test_skip() {
        let out = StepOutputs::skip(3);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_mixed() {
        let out = StepOutputs::from(vec![None, Some(Tensor::zeros(Shape::new(vec![2])))]);
        let values = out.into_inner();
        assert!(values[0].is_none());
        assert!(values[1].is_some());
    }
}
