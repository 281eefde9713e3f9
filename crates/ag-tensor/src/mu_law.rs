//! Mu-law companding between continuous signals in `[-1, 1]` and
//! `q_levels` quantization classes.

use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

fn mu(q_levels: usize) -> Result<f32> {
    if q_levels < 2 {
        return Err(TensorError::Other(format!(
            "mu-law needs at least 2 levels, got {}",
            q_levels
        )));
    }
    Ok((q_levels - 1) as f32)
}

/// Maps a sample in `[-1, 1]` to its class in `0..q_levels`.
pub fn encode_sample(x: f32, mu: f32) -> f32 {
    let x = x.clamp(-1.0, 1.0);
    let x_mu = x.signum() * (1.0 + mu * x.abs()).ln() / (1.0 + mu).ln();
    ((x_mu + 1.0) / 2.0 * mu + 0.5).floor()
}

/// Maps a class in `0..q_levels` back to a sample in `[-1, 1]`.
pub fn decode_sample(class: f32, mu: f32) -> f32 {
    let x = class / mu * 2.0 - 1.0;
    x.signum() * ((1.0 + mu).powf(x.abs()) - 1.0) / mu
}

/// Quantizes every element of `signal` into `q_levels` classes.
pub fn encode(signal: &Tensor, q_levels: usize) -> Result<Tensor> {
    let mu = mu(q_levels)?;
    Ok(signal.map(|x| encode_sample(x, mu)))
}

/// Decodes class indices back into a continuous signal.
pub fn decode(classes: &Tensor, q_levels: usize) -> Result<Tensor> {
    let mu = mu(q_levels)?;
    Ok(classes.map(|c| decode_sample(c, mu)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_extremes() {
        let t = Tensor::new(vec![-1.0, 0.0, 1.0], Shape::new(vec![3]));
        let q = encode(&t, 256).unwrap();
        assert_eq!(q.data_f32(), &[0.0, 128.0, 255.0]);
        let back = decode(&q, 256).unwrap();
        assert_abs_diff_eq!(back.data_f32()[0], -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(back.data_f32()[2], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_small_values_are_resolved_finely() {
        let t = Tensor::new(vec![0.01, -0.01, 0.5], Shape::new(vec![3]));
        let back = decode(&encode(&t, 256).unwrap(), 256).unwrap();
        assert_abs_diff_eq!(back.data_f32()[0], 0.01, epsilon = 2e-3);
        assert_abs_diff_eq!(back.data_f32()[1], -0.01, epsilon = 2e-3);
        assert_abs_diff_eq!(back.data_f32()[2], 0.5, epsilon = 3e-2);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let t = Tensor::new(vec![3.0], Shape::new(vec![1]));
        assert_eq!(encode(&t, 16).unwrap().data_f32(), &[15.0]);
    }

    #[test]
    fn test_rejects_single_level() {
        let t = Tensor::zeros(Shape::new(vec![1]));
        assert!(encode(&t, 1).is_err());
    }
}
