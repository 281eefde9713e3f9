use ag_tensor::Tensor;

/// Receives the finalized outputs of every batch.
pub trait OutputSink {
    /// Called once per batch with one tensor per output slot.
    fn process(&mut self, outputs: &[Tensor], batch_index: usize);
}

impl<F> OutputSink for F
where
    F: FnMut(&[Tensor], usize),
{
    fn process(&mut self, outputs: &[Tensor], batch_index: usize) {
        self(outputs, batch_index)
    }
}

/// Keeps every batch's outputs in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    batches: Vec<(usize, Vec<Tensor>)>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Outputs of the batch with index `batch_index`.
    pub fn get(&self, batch_index: usize) -> Option<&[Tensor]> {
        self.batches
            .iter()
            .find(|(i, _)| *i == batch_index)
            .map(|(_, outputs)| outputs.as_slice())
    }

    pub fn into_inner(self) -> Vec<(usize, Vec<Tensor>)> {
        self.batches
    }
}

impl OutputSink for CollectSink {
    fn process(&mut self, outputs: &[Tensor], batch_index: usize) {
        self.batches.push((batch_index, outputs.to_vec()));
    }
}
