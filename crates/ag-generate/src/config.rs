use ag_model::Parameters;
use ag_tensor::Device;
use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};

/// Settings of a generation run, typically loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Length of the generated continuation in seconds.
    #[serde(default = "default_seconds")]
    pub output_duration_sec: f64,

    /// Length of each prompt in seconds.
    #[serde(default = "default_seconds")]
    pub prompt_length_sec: f64,

    /// Start of each prompt in seconds; `null` draws a random position.
    #[serde(default = "default_prompts_position_sec")]
    pub prompts_position_sec: Vec<Option<f64>>,

    /// Keyword parameters forwarded to every `generate_step` call.
    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Stop after this many batches; all of them when unset.
    #[serde(default)]
    pub n_batches: Option<usize>,

    /// Requested compute device (`"cpu"`, `"cuda"`, `"cuda:N"`).
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_true")]
    pub disable_grads: bool,

    /// Pre-allocate the generated steps as zeros after each prompt.
    #[serde(default = "default_true")]
    pub add_blank: bool,

    /// Stride of the step loop in base steps.
    #[serde(default = "default_time_hop")]
    pub time_hop: usize,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_seconds() -> f64 {
    1.0
}

fn default_prompts_position_sec() -> Vec<Option<f64>> {
    vec![None]
}

fn default_batch_size() -> usize {
    1
}

fn default_device() -> String {
    "cuda:0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_time_hop() -> usize {
    1
}

fn default_sample_rate() -> u32 {
    16000
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            output_duration_sec: default_seconds(),
            prompt_length_sec: default_seconds(),
            prompts_position_sec: default_prompts_position_sec(),
            parameters: Parameters::default(),
            batch_size: default_batch_size(),
            n_batches: None,
            device: default_device(),
            disable_grads: true,
            add_blank: true,
            time_hop: default_time_hop(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl GenerateConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GenerateConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_hop == 0 {
            return Err(GenerateError::Config("time_hop must be >= 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(GenerateError::Config("batch_size must be >= 1".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(GenerateError::Config("sample_rate must be >= 1".to_string()));
        }
        if !self.output_duration_sec.is_finite() || self.output_duration_sec < 0.0 {
            return Err(GenerateError::Config(format!(
                "output_duration_sec must be >= 0, got {}",
                self.output_duration_sec
            )));
        }
        if !self.prompt_length_sec.is_finite() || self.prompt_length_sec <= 0.0 {
            return Err(GenerateError::Config(format!(
                "prompt_length_sec must be > 0, got {}",
                self.prompt_length_sec
            )));
        }
        let bad_position = self
            .prompts_position_sec
            .iter()
            .flatten()
            .find(|p| !p.is_finite() || **p < 0.0);
        if let Some(bad) = bad_position {
            return Err(GenerateError::Config(format!(
                "prompt positions must be >= 0, got {}",
                bad
            )));
        }
        let samples = self.output_duration_sec * self.sample_rate as f64;
        let steps = (samples / self.time_hop as f64).ceil();
        if steps >= usize::MAX as f64 || (steps as usize).checked_mul(self.time_hop).is_none() {
            return Err(GenerateError::Config(format!(
                "output_duration_sec {} exceeds the step range",
                self.output_duration_sec
            )));
        }
        self.device()?;
        Ok(())
    }

    pub fn device(&self) -> Result<Device> {
        Ok(self.device.parse::<Device>()?)
    }

    /// Number of loop iterations needed to cover `output_duration_sec`.
    pub fn n_steps(&self) -> usize {
        let samples = self.output_duration_sec * self.sample_rate as f64;
        (samples / self.time_hop.max(1) as f64).ceil() as usize
    }

    /// Prompt length in samples.
    pub fn prompt_length(&self) -> usize {
        (self.prompt_length_sec * self.sample_rate as f64).round() as usize
    }

    /// Prompt start positions in samples, `None` for random ones.
    pub fn prompt_positions(&self) -> Vec<Option<usize>> {
        self.prompts_position_sec
            .iter()
            .map(|p| p.map(|sec| (sec * self.sample_rate as f64).round() as usize))
            .collect()
    }
}
