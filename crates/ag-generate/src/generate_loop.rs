use ag_data::{PromptLoader, SignalBank};
use ag_model::{Arm, Parameters};
use ag_tensor::{Batch, BatchItem, Device, Tensor};

use crate::config::GenerateConfig;
use crate::error::{GenerateError, Result};
use crate::guard::RunGuard;
use crate::interface::Interface;
use crate::prompt::prepare_tensor;
use crate::sink::OutputSink;

/// Prompts are brought to at least `[batch, time]`.
const MIN_PROMPT_RANK: usize = 2;

/// Bookkeeping of one generated batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_index: usize,
    /// Steps where the network was called.
    pub steps_run: usize,
    /// Steps skipped because an earlier write already covered them.
    pub steps_skipped: usize,
    /// Values written to output slots.
    pub writes: usize,
    /// Final position of the step cursor.
    pub until: usize,
}

/// Drives an [`Arm`] step by step over batches of prompts.
///
/// Batch item `j` is bound to slot `j`. Slots with a setter are outputs:
/// the values returned by each `generate_step` call are written to them in
/// declared order, and the finished buffers are handed to the sink. When
/// several outputs are written in one step, the advance of the last one
/// decides the next step.
///
/// A batch item bound to a parameter slot replaces its value, and the new
/// value stays in place for later batches that leave the slot empty.
#[derive(Debug)]
pub struct GenerateLoop {
    interfaces: Vec<Interface>,
    n_steps: usize,
    time_hop: usize,
    n_batches: Option<usize>,
    device: Device,
    disable_grads: bool,
    add_blank: bool,
    parameters: Parameters,
}

impl GenerateLoop {
    pub fn new(interfaces: Vec<Interface>, n_steps: usize) -> Result<Self> {
        if interfaces.is_empty() {
            return Err(GenerateError::Config("no slots declared".to_string()));
        }
        for (i, itf) in interfaces.iter().enumerate() {
            if interfaces[..i].iter().any(|other| other.name() == itf.name()) {
                return Err(GenerateError::Config(format!(
                    "slot '{}' declared twice",
                    itf.name()
                )));
            }
            if itf.is_parameter() && !itf.is_bound() {
                return Err(GenerateError::Config(format!(
                    "parameter slot '{}' has no value",
                    itf.name()
                )));
            }
        }
        if !interfaces.iter().any(Interface::is_writable) {
            return Err(GenerateError::Config("no writable slot declared".to_string()));
        }

        Ok(GenerateLoop {
            interfaces,
            n_steps,
            time_hop: 1,
            n_batches: None,
            device: Device::Cuda(0),
            disable_grads: true,
            add_blank: true,
            parameters: Parameters::new(),
        })
    }

    pub fn from_config(config: &GenerateConfig, interfaces: Vec<Interface>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(interfaces, config.n_steps())?
            .with_time_hop(config.time_hop)
            .with_n_batches(config.n_batches)
            .with_device(config.device()?)
            .with_disable_grads(config.disable_grads)
            .with_add_blank(config.add_blank)
            .with_parameters(config.parameters.clone()))
    }

    /// A loader serving the prompts described by `config` from `bank`.
    pub fn prompt_loader(config: &GenerateConfig, bank: SignalBank) -> Result<PromptLoader> {
        if bank.sample_rate() != config.sample_rate {
            return Err(GenerateError::Config(format!(
                "bank sample rate {} does not match configured {}",
                bank.sample_rate(),
                config.sample_rate
            )));
        }
        Ok(PromptLoader::new(
            bank,
            config.prompt_length(),
            &config.prompt_positions(),
            config.batch_size,
        )?)
    }

    pub fn with_time_hop(mut self, time_hop: usize) -> Self {
        self.time_hop = time_hop;
        self
    }

    pub fn with_n_batches(mut self, n_batches: Option<usize>) -> Self {
        self.n_batches = n_batches;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_disable_grads(mut self, disable_grads: bool) -> Self {
        self.disable_grads = disable_grads;
        self
    }

    pub fn with_add_blank(mut self, add_blank: bool) -> Self {
        self.add_blank = add_blank;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn time_hop(&self) -> usize {
        self.time_hop
    }

    /// Names of the output slots, in the order outputs are produced.
    pub fn output_names(&self) -> Vec<&str> {
        self.interfaces
            .iter()
            .filter(|itf| itf.is_writable())
            .map(Interface::name)
            .collect()
    }

    /// Generate a continuation for every batch and hand each batch's outputs
    /// to `sink`.
    ///
    /// The network is put in generation mode for the whole run and restored
    /// afterwards, whether the run succeeds or not.
    pub fn run<N, I, E, S>(
        &mut self,
        net: &mut N,
        batches: I,
        sink: &mut S,
    ) -> Result<Vec<BatchReport>>
    where
        N: Arm + ?Sized,
        I: IntoIterator<Item = std::result::Result<Batch, E>>,
        GenerateError: From<E>,
        S: OutputSink + ?Sized,
    {
        let span = self.step_range()?;

        let mut net = RunGuard::enter(net, self.device, self.disable_grads)?;
        let device = net.device();
        tracing::info!(
            device = %device,
            n_steps = self.n_steps,
            time_hop = self.time_hop,
            add_blank = self.add_blank,
            "generation started"
        );

        let mut reports = Vec::new();
        let limit = self.n_batches.unwrap_or(usize::MAX);
        for (batch_index, batch) in batches.into_iter().take(limit).enumerate() {
            let report = self.run_batch(&mut *net, batch?, batch_index, device, span, sink)?;
            tracing::info!(
                batch = batch_index,
                steps = report.steps_run,
                skipped = report.steps_skipped,
                writes = report.writes,
                "batch generated"
            );
            reports.push(report);
        }

        tracing::info!(batches = reports.len(), "generation finished");
        Ok(reports)
    }

    fn run_batch<N, S>(
        &mut self,
        net: &mut N,
        batch: Batch,
        batch_index: usize,
        device: Device,
        span: usize,
        sink: &mut S,
    ) -> Result<BatchReport>
    where
        N: Arm + ?Sized,
        S: OutputSink + ?Sized,
    {
        let batch = batch
            .iter()
            .map(|item| item.to_device(device))
            .collect::<ag_tensor::Result<Batch>>()?;
        net.before_generate(&batch, batch_index)?;

        let (active, prompt_len) = self.bind(&batch, device, span)?;
        let prior_t = if self.add_blank {
            prompt_len.ok_or_else(|| {
                GenerateError::Config("blank padding needs a prompt in the first slot".to_string())
            })?
        } else {
            net.shift()
        };
        let outputs: Vec<usize> = (0..self.interfaces.len())
            .filter(|&j| self.interfaces[j].is_writable())
            .collect();

        let mut report = BatchReport {
            batch_index,
            ..Default::default()
        };
        let mut until = 0;
        for t in (0..span).step_by(self.time_hop) {
            if t < until {
                report.steps_skipped += 1;
                continue;
            }
            let inputs = active
                .iter()
                .map(|&j| {
                    let itf = &self.interfaces[j];
                    itf.get(if itf.is_writable() { t + prior_t } else { t })
                })
                .collect::<Result<Vec<Tensor>>>()?;

            let step = net.generate_step(&inputs, t + prior_t, &self.parameters)?;
            if step.len() != outputs.len() {
                return Err(GenerateError::Config(format!(
                    "network returned {} values for {} output slots",
                    step.len(),
                    outputs.len()
                )));
            }
            for (&j, value) in outputs.iter().zip(step) {
                if let Some(value) = value {
                    until = t + self.interfaces[j].set(t + prior_t, &value)?;
                    report.writes += 1;
                }
            }
            report.steps_run += 1;
            tracing::trace!(t, until, "step");
        }
        report.until = until;

        let finals = outputs
            .iter()
            .map(|&j| {
                let itf = &mut self.interfaces[j];
                itf.take_data().ok_or_else(|| {
                    GenerateError::Interface(format!("'{}' lost its buffer", itf.name()))
                })
            })
            .collect::<Result<Vec<Tensor>>>()?;
        let finals = net.after_generate(finals, batch_index)?;
        if finals.len() != outputs.len() {
            return Err(GenerateError::Config(format!(
                "after_generate returned {} outputs for {} output slots",
                finals.len(),
                outputs.len()
            )));
        }
        sink.process(&finals, batch_index);
        Ok(report)
    }

    /// Number of base steps covered by a batch.
    fn step_range(&self) -> Result<usize> {
        if self.time_hop == 0 {
            return Err(GenerateError::Config("time_hop must be >= 1".to_string()));
        }
        self.n_steps.checked_mul(self.time_hop).ok_or_else(|| {
            GenerateError::Config(format!(
                "{} steps of {} overflow the step range",
                self.n_steps, self.time_hop
            ))
        })
    }

    /// Binds batch items to slots and returns the active slots plus the
    /// prompt length of the first one.
    fn bind(
        &mut self,
        batch: &Batch,
        device: Device,
        span: usize,
    ) -> Result<(Vec<usize>, Option<usize>)> {
        if batch.len() > self.interfaces.len() {
            return Err(GenerateError::Config(format!(
                "batch has {} items for {} slots",
                batch.len(),
                self.interfaces.len()
            )));
        }
        let n_blanks = if self.add_blank { span } else { 0 };

        let mut active = Vec::with_capacity(self.interfaces.len());
        let mut prompt_len = None;
        for (j, itf) in self.interfaces.iter_mut().enumerate() {
            match batch.get(j) {
                Some(item) if !matches!(item, BatchItem::Missing) => {
                    let prompt = prepare_tensor(item, device, n_blanks, MIN_PROMPT_RANK)?;
                    if j == 0 {
                        prompt_len = Some(prompt.time_len()? - n_blanks);
                    }
                    itf.bind(prompt);
                    active.push(j);
                }
                _ if itf.is_parameter() && itf.is_bound() => active.push(j),
                _ if itf.is_writable() => {
                    return Err(GenerateError::Config(format!(
                        "writable slot '{}' has no prompt",
                        itf.name()
                    )))
                }
                _ => {}
            }
        }
        Ok((active, prompt_len))
    }
}
