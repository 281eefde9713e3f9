use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SamplerError};

/// Parameters of an [`IndicesSampler`].
#[derive(Debug, Clone)]
pub struct IndicesSamplerConfig {
    /// Number of indices to produce. Zero means "only the explicit ones".
    pub n: usize,
    /// Indices that are always part of the sequence, in order.
    pub indices: Vec<usize>,
    /// Inclusive lower bound of random draws.
    pub min_i: usize,
    /// Exclusive upper bound of random draws. Required whenever `n`
    /// exceeds the number of explicit indices.
    pub max_i: Option<usize>,
    /// Draw a fresh sequence after every completed traversal.
    pub redraw: bool,
    /// Seed for reproducible draws. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for IndicesSamplerConfig {
    fn default() -> Self {
        Self {
            n: 0,
            indices: Vec::new(),
            min_i: 0,
            max_i: None,
            redraw: true,
            seed: None,
        }
    }
}

/// Selects which positions of a dataset serve as generation prompts.
///
/// The drawn sequence mixes explicit indices with uniform random ones:
///
/// | `n` | explicit `k` | sequence                                  |
/// |-----|--------------|-------------------------------------------|
/// | 0   | 0            | configuration error                       |
/// | >0  | 0            | `n` draws in `[min_i, max_i)`             |
/// | 0   | >0           | the explicit indices                      |
/// | >0  | `0<k<n`      | the explicit indices, then `n - k` draws  |
/// | >0  | `k>=n`       | the explicit indices, not truncated       |
#[derive(Debug)]
pub struct IndicesSampler {
    config: IndicesSamplerConfig,
    indices: Vec<usize>,
    rng: StdRng,
}

impl IndicesSampler {
    /// Validate `config` and draw the first sequence.
    pub fn new(config: IndicesSamplerConfig) -> Result<Self> {
        let k = config.indices.len();
        if config.n == 0 && k == 0 {
            return Err(SamplerError::Config(
                "`indices` can not be empty if `n` == 0".to_string(),
            ));
        }
        if config.n > k {
            match config.max_i {
                None => {
                    return Err(SamplerError::Config(format!(
                        "random draws requested (n={}, explicit={}) but `max_i` is not set",
                        config.n, k
                    )))
                }
                Some(max_i) if max_i <= config.min_i => {
                    return Err(SamplerError::Config(format!(
                        "empty draw range [{}, {})",
                        config.min_i, max_i
                    )))
                }
                Some(_) => {}
            }
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut sampler = IndicesSampler {
            config,
            indices: Vec::new(),
            rng,
        };
        sampler.indices = sampler.draw();
        Ok(sampler)
    }

    /// Shorthand for `n` purely random indices in `[min_i, max_i)`.
    pub fn random(n: usize, min_i: usize, max_i: usize) -> Result<Self> {
        Self::new(IndicesSamplerConfig {
            n,
            min_i,
            max_i: Some(max_i),
            ..Default::default()
        })
    }

    /// Shorthand for a fixed sequence of indices.
    pub fn explicit(indices: Vec<usize>) -> Result<Self> {
        Self::new(IndicesSamplerConfig {
            indices,
            redraw: false,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &IndicesSamplerConfig {
        &self.config
    }

    /// The sequence the next traversal will yield.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over the current sequence.
    ///
    /// When the traversal runs to completion and `redraw` is set, a new
    /// sequence replaces the current one. An abandoned traversal leaves the
    /// sequence as it was.
    pub fn traverse(&mut self) -> Traversal<'_> {
        Traversal {
            sampler: self,
            pos: 0,
            finished: false,
        }
    }

    fn draw(&mut self) -> Vec<usize> {
        let k = self.config.indices.len();
        let n_random = self.config.n.saturating_sub(k);
        let mut drawn = self.config.indices.clone();
        if n_random > 0 {
            // validated in `new`
            let max_i = self.config.max_i.unwrap_or(self.config.min_i + 1);
            let min_i = self.config.min_i;
            drawn.extend((0..n_random).map(|_| self.rng.gen_range(min_i..max_i)));
        }
        drawn
    }
}

/// One pass over an [`IndicesSampler`]'s sequence.
#[derive(Debug)]
pub struct Traversal<'a> {
    sampler: &'a mut IndicesSampler,
    pos: usize,
    finished: bool,
}

impl Iterator for Traversal<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if let Some(&i) = self.sampler.indices.get(self.pos) {
            self.pos += 1;
            return Some(i);
        }
        if !self.finished {
            self.finished = true;
            if self.sampler.config.redraw {
                self.sampler.indices = self.sampler.draw();
                tracing::debug!(n = self.sampler.indices.len(), "redrew prompt indices");
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sampler.indices.len().saturating_sub(self.pos);
        if self.finished {
            (0, Some(0))
        } else {
            (remaining, Some(remaining))
        }
    }
}
