use ag_tensor::{mu_law, Batch, ComputeBackend, CpuBackend, Device, Shape, Tensor};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::arm::{Arm, Network, StepOutputs};
use crate::error::{ModelError, Result};
use crate::params::Parameters;

/// Parameter key read by [`MarkovArm::generate_step`].
pub const TEMPERATURE: &str = "temperature";

/// A first-order categorical autoregressive network over quantized classes.
///
/// Row `i` of the transition table holds the logits of the class following
/// class `i`. Each step reads the last class of every batch row and samples
/// the next one, greedily when no temperature is given.
///
/// Inputs: `[0]` the quantized signal `[batch, time]`, optionally `[1]` a
/// per-row temperature parameter (`[1]` or `[batch]`), used when the
/// `temperature` keyword is absent.
#[derive(Debug)]
pub struct MarkovArm {
    q_levels: usize,
    logits: Vec<f32>,
    decode_outputs: bool,
    seed: u64,
    rng: StdRng,
    backend: CpuBackend,
    training: bool,
    device: Device,
}

impl MarkovArm {
    /// Build from a `q_levels x q_levels` row-major transition logit table.
    pub fn new(q_levels: usize, logits: Vec<f32>) -> Result<Self> {
        if q_levels < 2 {
            return Err(ModelError::Other(format!(
                "q_levels must be >= 2, got {}",
                q_levels
            )));
        }
        if logits.len() != q_levels * q_levels {
            return Err(ModelError::TensorError(ag_tensor::TensorError::ShapeMismatch {
                expected: vec![q_levels, q_levels],
                got: vec![logits.len()],
            }));
        }
        Ok(MarkovArm {
            q_levels,
            logits,
            decode_outputs: false,
            seed: 0,
            rng: StdRng::seed_from_u64(0),
            backend: CpuBackend::new(),
            training: true,
            device: Device::Cpu,
        })
    }

    /// Estimate transition log-probabilities from a class sequence, with
    /// add-one smoothing so every transition stays reachable.
    pub fn from_sequence(q_levels: usize, classes: &[usize]) -> Result<Self> {
        if let Some(&bad) = classes.iter().find(|&&c| c >= q_levels) {
            return Err(ModelError::InvalidInput(format!(
                "class {} out of range for {} levels",
                bad, q_levels
            )));
        }
        let mut counts = vec![1.0f32; q_levels * q_levels];
        for pair in classes.windows(2) {
            counts[pair[0] * q_levels + pair[1]] += 1.0;
        }
        let mut logits = Vec::with_capacity(counts.len());
        for row in counts.chunks(q_levels) {
            let total: f32 = row.iter().sum();
            logits.extend(row.iter().map(|c| (c / total).ln()));
        }
        Self::new(q_levels, logits)
    }

    /// Base seed; batch `i` samples from `seed + i`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Mu-law decode outputs to `[-1, 1]` in `after_generate`.
    pub fn with_decode(mut self, decode_outputs: bool) -> Self {
        self.decode_outputs = decode_outputs;
        self
    }

    pub fn q_levels(&self) -> usize {
        self.q_levels
    }

    fn temperatures(&self, inputs: &[Tensor], params: &Parameters) -> Result<Option<Vec<f32>>> {
        if let Some(temps) = params.get_f32s(TEMPERATURE)? {
            return Ok(Some(temps));
        }
        Ok(inputs.get(1).map(|t| t.data_f32().to_vec()))
    }

    fn next_class(&mut self, prev: usize, temperature: Option<f32>) -> Result<usize> {
        let q = self.q_levels;
        let row = &self.logits[prev * q..(prev + 1) * q];
        let Some(temp) = temperature else {
            let best = self.backend.argmax(row, q)?;
            return Ok(best[0]);
        };

        // Clamp to a very small positive value so zero means "almost greedy".
        let temp = if temp <= 0.0 { 1e-7 } else { temp };
        let scaled = self.backend.scale(row, 1.0 / temp)?;
        let probs = self.backend.softmax(&scaled, q)?;
        match WeightedIndex::new(&probs) {
            Ok(dist) => Ok(dist.sample(&mut self.rng)),
            // Degenerate weights after extreme scaling
            Err(_) => Ok(self.backend.argmax(row, q)?[0]),
        }
    }
}

impl Network for MarkovArm {
    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn device(&self) -> Device {
        self.device
    }

    fn to_device(&mut self, device: Device) -> Result<()> {
        if !device.is_available() {
            return Err(ModelError::DeviceUnavailable(device.to_string()));
        }
        self.device = device;
        Ok(())
    }
}

impl Arm for MarkovArm {
    fn shift(&self) -> usize {
        1
    }

    fn before_generate(&mut self, _batch: &Batch, batch_index: usize) -> Result<()> {
        self.rng = StdRng::seed_from_u64(self.seed.wrapping_add(batch_index as u64));
        tracing::debug!(batch = batch_index, q_levels = self.q_levels, "markov network reset");
        Ok(())
    }

    fn generate_step(
        &mut self,
        inputs: &[Tensor],
        _t: usize,
        params: &Parameters,
    ) -> Result<StepOutputs> {
        let signal = inputs.first().ok_or(ModelError::InputArity {
            expected: 1,
            got: 0,
        })?;
        let time = signal.time_len()?;
        if time == 0 {
            return Err(ModelError::InvalidInput(
                "empty context window".to_string(),
            ));
        }
        let batch = signal.shape().dim(0);
        let last = signal.narrow(1, time - 1, 1)?;
        if last.shape().numel() != batch {
            return Err(ModelError::InvalidInput(format!(
                "expected one class per row, got shape {}",
                signal.shape()
            )));
        }

        let temps = self.temperatures(inputs, params)?;
        if let Some(temps) = &temps {
            if temps.len() != 1 && temps.len() != batch {
                return Err(ModelError::InvalidInput(format!(
                    "{} temperatures for a batch of {}",
                    temps.len(),
                    batch
                )));
            }
        }

        let mut next = Vec::with_capacity(batch);
        for (row, &value) in last.data_f32().iter().enumerate() {
            let prev = (value.round().max(0.0) as usize).min(self.q_levels - 1);
            let temp = temps.as_ref().map(|t| t[row % t.len()]);
            next.push(self.next_class(prev, temp)? as f32);
        }

        let out = Tensor::from_vec(next, Shape::new(vec![batch, 1]))?.to_device(signal.device());
        Ok(StepOutputs::from(out))
    }

    fn after_generate(&mut self, outputs: Vec<Tensor>, _batch_index: usize) -> Result<Vec<Tensor>> {
        if !self.decode_outputs {
            return Ok(outputs);
        }
        outputs
            .iter()
            .map(|t| Ok(mu_law::decode(t, self.q_levels)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(q: usize) -> MarkovArm {
        // 0 -> 1 -> 2 -> ... -> q-1 -> 0, strongly
        let classes: Vec<usize> = (0..50 * q).map(|i| i % q).collect();
        MarkovArm::from_sequence(q, &classes).unwrap()
    }

    fn column(values: &[f32]) -> Tensor {
        Tensor::new(values.to_vec(), Shape::new(vec![values.len(), 1]))
    }

    #[test]
    fn test_rejects_bad_table() {
        assert!(MarkovArm::new(1, vec![0.0]).is_err());
        assert!(MarkovArm::new(3, vec![0.0; 8]).is_err());
        assert!(MarkovArm::from_sequence(2, &[0, 2]).is_err());
    }

    #[test]
    fn test_greedy_follows_cycle() {
        let mut net = cycle(4);
        net.before_generate(&Vec::new(), 0).unwrap();
        let out = net
            .generate_step(&[column(&[0.0, 3.0])], 1, &Parameters::new())
            .unwrap();
        let values = out.into_inner();
        let next = values[0].as_ref().unwrap();
        assert_eq!(next.shape().dims(), &[2, 1]);
        assert_eq!(next.data_f32(), &[1.0, 0.0]);
    }

    #[test]
    fn test_reads_last_step_of_window() {
        let mut net = cycle(4);
        let window = Tensor::new(vec![0.0, 1.0, 2.0], Shape::new(vec![1, 3]));
        let out = net.generate_step(&[window], 3, &Parameters::new()).unwrap();
        assert_eq!(out.into_inner()[0].as_ref().unwrap().data_f32(), &[3.0]);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let params = Parameters::new().with(TEMPERATURE, 2.0);
        let run = |seed: u64| {
            let mut net = MarkovArm::new(8, vec![0.0; 64]).unwrap().with_seed(seed);
            net.before_generate(&Vec::new(), 1).unwrap();
            (0..16)
                .map(|t| {
                    let out = net.generate_step(&[column(&[0.0])], t, &params).unwrap();
                    out.into_inner()[0].as_ref().unwrap().data_f32()[0]
                })
                .collect::<Vec<f32>>()
        };
        assert_eq!(run(11), run(11));
        assert!(run(11).iter().all(|&c| (0.0..8.0).contains(&c)));
    }

    #[test]
    fn test_temperature_from_parameter_input() {
        let mut net = cycle(4);
        let temps = Tensor::new(vec![1e-6], Shape::new(vec![1]));
        let out = net
            .generate_step(&[column(&[2.0]), temps], 0, &Parameters::new())
            .unwrap();
        assert_eq!(out.into_inner()[0].as_ref().unwrap().data_f32(), &[3.0]);
    }

    #[test]
    fn test_temperature_count_must_match_batch() {
        let mut net = cycle(4);
        let params = Parameters::new().with(TEMPERATURE, vec![1.0, 1.0, 1.0]);
        assert!(net
            .generate_step(&[column(&[0.0, 1.0])], 0, &params)
            .is_err());
    }

    #[test]
    fn test_missing_input() {
        let mut net = cycle(4);
        let err = net.generate_step(&[], 0, &Parameters::new()).unwrap_err();
        assert!(matches!(err, ModelError::InputArity { .. }));
    }

    #[test]
    fn test_after_generate_decodes() {
        let mut net = cycle(256).with_decode(true);
        let outputs = vec![Tensor::new(vec![0.0, 255.0], Shape::new(vec![1, 2]))];
        let decoded = net.after_generate(outputs, 0).unwrap();
        approx::assert_abs_diff_eq!(decoded[0].data_f32()[0], -1.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(decoded[0].data_f32()[1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_device_placement() {
        let mut net = cycle(2);
        assert!(net.to_device(Device::Cuda(0)).is_err());
        assert!(net.to_device(Device::Cpu).is_ok());
        assert_eq!(net.device(), Device::Cpu);
    }
}
