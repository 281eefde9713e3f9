use ag_sampler::{IndicesSampler, IndicesSamplerConfig, Traversal};
use ag_tensor::{mu_law, Batch, BatchItem, Shape, Tensor};

use crate::bank::SignalBank;
use crate::error::{DataError, Result};

/// Representation prompts are served in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFeature {
    /// Raw samples.
    #[default]
    Signal,
    /// Mu-law classes in `0..q_levels`.
    MuLaw { q_levels: usize },
}

/// Serves batches of prompts cut from a [`SignalBank`].
///
/// One prompt is produced per requested position; `None` positions are drawn
/// at random on every pass, explicit ones are always served as given.
/// Batches are `[BatchItem::Tensor([batch, prompt_length])]`.
#[derive(Debug)]
pub struct PromptLoader {
    bank: SignalBank,
    prompt_length: usize,
    batch_size: usize,
    feature: PromptFeature,
    sampler: IndicesSampler,
}

impl PromptLoader {
    pub fn new(
        bank: SignalBank,
        prompt_length: usize,
        positions: &[Option<usize>],
        batch_size: usize,
    ) -> Result<Self> {
        Self::build(bank, prompt_length, positions, batch_size, None)
    }

    /// Like [`PromptLoader::new`] with reproducible random positions.
    pub fn with_seed(
        bank: SignalBank,
        prompt_length: usize,
        positions: &[Option<usize>],
        batch_size: usize,
        seed: u64,
    ) -> Result<Self> {
        Self::build(bank, prompt_length, positions, batch_size, Some(seed))
    }

    fn build(
        bank: SignalBank,
        prompt_length: usize,
        positions: &[Option<usize>],
        batch_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if prompt_length == 0 || prompt_length > bank.len() {
            return Err(DataError::PromptTooLong {
                prompt_length,
                len: bank.len(),
            });
        }
        let max_start = bank.len() - prompt_length;
        let explicit: Vec<usize> = positions.iter().flatten().copied().collect();
        if let Some(&bad) = explicit.iter().find(|&&p| p > max_start) {
            return Err(DataError::OutOfRange {
                start: bad,
                end: bad + prompt_length,
                len: bank.len(),
            });
        }

        let sampler = IndicesSampler::new(IndicesSamplerConfig {
            n: positions.len(),
            indices: explicit,
            min_i: 0,
            max_i: Some(max_start + 1),
            redraw: true,
            seed,
        })?;

        Ok(PromptLoader {
            bank,
            prompt_length,
            batch_size: batch_size.max(1),
            feature: PromptFeature::default(),
            sampler,
        })
    }

    pub fn with_feature(mut self, feature: PromptFeature) -> Self {
        self.feature = feature;
        self
    }

    pub fn bank(&self) -> &SignalBank {
        &self.bank
    }

    pub fn prompt_length(&self) -> usize {
        self.prompt_length
    }

    /// Number of batches in one pass.
    pub fn len(&self) -> usize {
        self.sampler.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One pass over the prompts. A completed pass redraws the random
    /// positions for the next one.
    pub fn batches(&mut self) -> Batches<'_> {
        Batches {
            positions: self.sampler.traverse(),
            bank: &self.bank,
            prompt_length: self.prompt_length,
            batch_size: self.batch_size,
            feature: self.feature,
        }
    }
}

/// Iterator over the batches of one [`PromptLoader`] pass.
#[derive(Debug)]
pub struct Batches<'a> {
    positions: Traversal<'a>,
    bank: &'a SignalBank,
    prompt_length: usize,
    batch_size: usize,
    feature: PromptFeature,
}

impl Batches<'_> {
    fn read_batch(&self, starts: &[usize]) -> Result<Batch> {
        let mut data = Vec::with_capacity(starts.len() * self.prompt_length);
        for &start in starts {
            data.extend(self.bank.read(start, self.prompt_length)?);
        }
        let signal = Tensor::from_vec(data, Shape::new(vec![starts.len(), self.prompt_length]))?;
        let prompt = match self.feature {
            PromptFeature::Signal => signal,
            PromptFeature::MuLaw { q_levels } => mu_law::encode(&signal, q_levels)?,
        };
        Ok(vec![BatchItem::Tensor(prompt)])
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let starts: Vec<usize> = self.positions.by_ref().take(self.batch_size).collect();
        if starts.is_empty() {
            return None;
        }
        Some(self.read_batch(&starts))
    }
}
