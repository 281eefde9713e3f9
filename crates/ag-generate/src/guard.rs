use std::ops::{Deref, DerefMut};

use ag_model::Network;
use ag_tensor::{Device, NoGradGuard};

use crate::error::Result;

/// Holds a network in generation mode for the duration of a run.
///
/// Entering switches the network to evaluation mode, moves it to the
/// requested device (or the CPU when that device is unavailable) and
/// optionally disables gradient tracking. Dropping the guard restores the
/// previous device, mode and gradient flag, also when the run fails.
pub struct RunGuard<'a, N: Network + ?Sized> {
    net: &'a mut N,
    was_training: bool,
    initial_device: Device,
    no_grad: Option<NoGradGuard>,
}

impl<'a, N: Network + ?Sized> RunGuard<'a, N> {
    pub fn enter(net: &'a mut N, device: Device, disable_grads: bool) -> Result<Self> {
        let was_training = net.is_training();
        let initial_device = net.device();
        let mut guard = RunGuard {
            net,
            was_training,
            initial_device,
            no_grad: None,
        };

        guard.net.set_training(false);
        let target = device.or_cpu();
        if target != device {
            tracing::debug!(requested = %device, using = %target, "device unavailable, falling back");
        }
        guard.net.to_device(target)?;
        if disable_grads {
            guard.no_grad = Some(NoGradGuard::new());
        }
        Ok(guard)
    }

    /// The device the network runs on while the guard is held.
    pub fn device(&self) -> Device {
        self.net.device()
    }
}

impl<N: Network + ?Sized> Deref for RunGuard<'_, N> {
    type Target = N;

    fn deref(&self) -> &N {
        &*self.net
    }
}

impl<N: Network + ?Sized> DerefMut for RunGuard<'_, N> {
    fn deref_mut(&mut self) -> &mut N {
        &mut *self.net
    }
}

impl<N: Network + ?Sized> Drop for RunGuard<'_, N> {
    fn drop(&mut self) {
        if let Err(e) = self.net.to_device(self.initial_device) {
            tracing::error!(device = %self.initial_device, error = %e, "failed to restore device");
        }
        self.net.set_training(self.was_training);
        drop(self.no_grad.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_model::ModelError;
    use ag_tensor::is_grad_enabled;

    #[derive(Debug, Default)]
    struct Probe {
        training: bool,
        device: Device,
        moves: Vec<Device>,
        refuse: bool,
    }

    impl Network for Probe {
        fn is_training(&self) -> bool {
            self.training
        }

        fn set_training(&mut self, training: bool) {
            self.training = training;
        }

        fn device(&self) -> Device {
            self.device
        }

        fn to_device(&mut self, device: Device) -> ag_model::Result<()> {
            if self.refuse {
                return Err(ModelError::DeviceUnavailable(device.to_string()));
            }
            self.moves.push(device);
            self.device = device;
            Ok(())
        }
    }

    #[test]
    fn test_enter_and_restore() {
        let mut net = Probe {
            training: true,
            ..Default::default()
        };
        {
            let guard = RunGuard::enter(&mut net, Device::Cuda(0), true).unwrap();
            assert!(!guard.is_training());
            assert_eq!(guard.device(), Device::Cpu);
            assert!(!is_grad_enabled());
        }
        assert!(net.training);
        assert!(is_grad_enabled());
        assert_eq!(net.moves, vec![Device::Cpu, Device::Cpu]);
    }

    #[test]
    fn test_grads_untouched_when_not_disabled() {
        let mut net = Probe::default();
        let guard = RunGuard::enter(&mut net, Device::Cpu, false).unwrap();
        assert!(is_grad_enabled());
        drop(guard);
        assert!(!net.training);
    }

    #[test]
    fn test_failed_move_restores_mode() {
        let mut net = Probe {
            training: true,
            refuse: true,
            ..Default::default()
        };
        assert!(RunGuard::enter(&mut net, Device::Cpu, true).is_err());
        assert!(net.training);
        assert!(is_grad_enabled());
    }
}
