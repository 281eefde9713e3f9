use std::fmt;

use ag_tensor::{Tensor, TIME_AXIS};

use crate::error::{GenerateError, Result};

/// How an [`Interface`] exposes its buffer at step `t`.
pub enum Getter {
    /// The last `n` steps before `t`: `data[:, max(0, t-n)..t]`.
    Window(usize),
    /// The whole buffer, whatever `t` is.
    Whole,
    Custom(Box<dyn Fn(&Tensor, usize) -> Result<Tensor>>),
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Getter::Window(n) => write!(f, "Window({})", n),
            Getter::Whole => write!(f, "Whole"),
            Getter::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// How an [`Interface`] writes a value at step `t`.
///
/// Returns the number of base steps the write advances the clock by.
pub enum Setter {
    /// Writes `value` at `data[:, t..t+n]`, growing the buffer with zeros
    /// as needed, and advances by `n`, the value's time length. A value
    /// one rank below the buffer is a single step.
    Step,
    Custom(Box<dyn FnMut(&mut Tensor, usize, &Tensor) -> Result<usize>>),
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setter::Step => write!(f, "Step"),
            Setter::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// A named, time-indexed read/write handle over one buffer.
///
/// An interface without a setter is a parameter: a constant read every step
/// (e.g. a sampling temperature) rather than a signal being generated.
#[derive(Debug)]
pub struct Interface {
    name: String,
    data: Option<Tensor>,
    getter: Getter,
    setter: Option<Setter>,
}

impl Interface {
    pub fn new(name: impl Into<String>, getter: Getter, setter: Option<Setter>) -> Self {
        Interface {
            name: name.into(),
            data: None,
            getter,
            setter,
        }
    }

    /// A generable signal read through a window of `window` steps and written
    /// one value at a time.
    pub fn signal(name: impl Into<String>, window: usize) -> Self {
        Self::new(name, Getter::Window(window), Some(Setter::Step))
    }

    /// A read-only constant, exposed whole at every step.
    pub fn parameter(name: impl Into<String>, value: Tensor) -> Self {
        Self::new(name, Getter::Whole, None).with_data(value)
    }

    pub fn with_data(mut self, data: Tensor) -> Self {
        self.data = Some(data);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> Option<&Tensor> {
        self.data.as_ref()
    }

    pub fn is_parameter(&self) -> bool {
        self.setter.is_none()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    /// Replaces the buffer.
    pub fn bind(&mut self, data: Tensor) {
        self.data = Some(data);
    }

    /// Hands the buffer over, leaving the interface unbound.
    pub fn take_data(&mut self) -> Option<Tensor> {
        self.data.take()
    }

    /// The value(s) the network needs at absolute step `t`.
    pub fn get(&self, t: usize) -> Result<Tensor> {
        let data = self.bound()?;
        match &self.getter {
            Getter::Window(n) => {
                let len = data.time_len()?;
                if t > len {
                    return Err(GenerateError::Interface(format!(
                        "'{}': step {} is past the end of a buffer of {} steps",
                        self.name, t, len
                    )));
                }
                let start = t.saturating_sub(*n);
                Ok(data.narrow(TIME_AXIS, start, t - start)?)
            }
            Getter::Whole => Ok(data.clone()),
            Getter::Custom(f) => f(data, t),
        }
    }

    /// Writes `value` at step `t` and returns how many steps the write
    /// advances the clock by (always at least 1).
    pub fn set(&mut self, t: usize, value: &Tensor) -> Result<usize> {
        let name = &self.name;
        let setter = self.setter.as_mut().ok_or_else(|| {
            GenerateError::Interface(format!("'{}' is a parameter and cannot be written", name))
        })?;
        let data = self.data.as_mut().ok_or_else(|| {
            GenerateError::Interface(format!("'{}' has no buffer bound", name))
        })?;
        let advance = match setter {
            Setter::Step => write_steps(data, t, value)?,
            Setter::Custom(f) => f(data, t, value)?,
        };
        if advance == 0 {
            return Err(GenerateError::Interface(format!(
                "'{}': write at step {} did not advance the clock",
                name, t
            )));
        }
        Ok(advance)
    }

    fn bound(&self) -> Result<&Tensor> {
        self.data.as_ref().ok_or_else(|| {
            GenerateError::Interface(format!("'{}' has no buffer bound", self.name))
        })
    }
}

fn write_steps(data: &mut Tensor, t: usize, value: &Tensor) -> Result<usize> {
    let value = if value.rank() + 1 == data.rank() {
        value.unsqueeze(TIME_AXIS)?
    } else {
        value.clone()
    };
    let n = value.time_len()?;
    let len = data.time_len()?;
    if t + n > len {
        *data = data.pad_zeros(TIME_AXIS, t + n - len)?;
    }
    data.assign(TIME_AXIS, t, &value)?;
    Ok(n)
}
