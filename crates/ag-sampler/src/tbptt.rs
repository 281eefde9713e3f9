use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SamplerError};

/// Yields batches of start indices for truncated back-propagation through
/// time.
///
/// The signal is cut into chunks of `chunk_length` samples. Each batch row
/// ("track") follows one chunk from a random offset, and consecutive batches
/// advance every track by `seq_len` samples so recurrent state can be
/// carried from one batch to the next.
#[derive(Debug)]
pub struct TbpttSampler {
    chunk_length: usize,
    seq_len: usize,
    n_chunks: usize,
    n_per_chunk: usize,
    batch_size: usize,
    downsampling: usize,
    rng: StdRng,
}

impl TbpttSampler {
    pub fn new(
        n_samples: usize,
        batch_size: usize,
        chunk_length: usize,
        seq_len: usize,
    ) -> Result<Self> {
        if seq_len == 0 || chunk_length < seq_len {
            return Err(SamplerError::Config(format!(
                "need 0 < seq_len <= chunk_length, got seq_len={} chunk_length={}",
                seq_len, chunk_length
            )));
        }
        if batch_size == 0 {
            return Err(SamplerError::Config("batch_size must be > 0".to_string()));
        }
        let n_chunks = n_samples / chunk_length;
        // The last chunk is kept free so random offsets never run past the end.
        if n_chunks < 2 {
            return Err(SamplerError::Config(format!(
                "{} samples hold fewer than 2 chunks of {}",
                n_samples, chunk_length
            )));
        }

        Ok(TbpttSampler {
            chunk_length,
            seq_len,
            n_chunks,
            n_per_chunk: chunk_length / seq_len,
            batch_size: batch_size.min(n_chunks),
            downsampling: 1,
            rng: StdRng::from_entropy(),
        })
    }

    /// Number of random-offset passes over each group of chunks.
    pub fn with_downsampling(mut self, downsampling: usize) -> Self {
        self.downsampling = downsampling.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Effective batch size, capped by the number of chunks.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches yielded by one epoch.
    pub fn len(&self) -> usize {
        let n_groups = (self.n_chunks - 1).div_ceil(self.batch_size);
        self.downsampling * n_groups * self.n_per_chunk
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw one epoch of batches.
    pub fn epoch(&mut self) -> Vec<Vec<usize>> {
        let mut chunks: Vec<usize> = (0..self.n_chunks - 1).collect();
        chunks.shuffle(&mut self.rng);

        let mut batches = Vec::with_capacity(self.len());
        for group in chunks.chunks(self.batch_size) {
            for _ in 0..self.downsampling {
                let tracks: Vec<usize> = group
                    .iter()
                    .map(|&c| c * self.chunk_length + self.rng.gen_range(0..self.chunk_length))
                    .collect();
                for start in 0..self.n_per_chunk {
                    batches.push(
                        tracks
                            .iter()
                            .map(|&t| t + start * self.seq_len)
                            .collect(),
                    );
                }
            }
        }
        batches
    }
}
