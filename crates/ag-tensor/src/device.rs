use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

/// Where tensors live and networks compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory, always available.
    #[default]
    Cpu,
    /// A CUDA accelerator by ordinal.
    Cuda(usize),
}

impl Device {
    /// Returns true if this device can be used by the current build.
    ///
    /// Only the CPU backend is compiled in, so accelerators are never
    /// available.
    pub fn is_available(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Returns this device if it is available, or the CPU otherwise.
    pub fn or_cpu(self) -> Device {
        if self.is_available() {
            self
        } else {
            Device::Cpu
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{}", i),
        }
    }
}

impl FromStr for Device {
    type Err = TensorError;

    /// Parses `"cpu"`, `"cuda"` (ordinal 0) or `"cuda:N"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            _ => match s.strip_prefix("cuda:") {
                Some(ordinal) => ordinal
                    .parse::<usize>()
                    .map(Device::Cuda)
                    .map_err(|_| TensorError::UnknownDevice(s.to_string())),
                None => Err(TensorError::UnknownDevice(s.to_string())),
            },
        }
    }
}
