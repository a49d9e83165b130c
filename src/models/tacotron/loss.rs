//! L1 reconstruction losses

use candle_core::Tensor;

use crate::error::Result;

/// Mean absolute difference between two tensors of the same shape
pub fn l1_loss(prediction: &Tensor, target: &Tensor) -> Result<Tensor> {
    Ok((prediction - target)?.abs()?.mean_all()?)
}

/// Loss tensors of one graph. `total` is what the optimizer minimizes.
pub struct Loss {
    /// Sum of the component losses
    pub total: Tensor,
    /// Decoder mel loss, only when the graph runs from sentences
    pub mel: Option<Tensor>,
    /// Post-processing linear loss
    pub linear: Tensor,
}

/// Loss scalars copied off the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossValues {
    /// Total loss
    pub total: f32,
    /// Decoder mel loss
    pub mel: Option<f32>,
    /// Linear loss
    pub linear: f32,
}

impl Loss {
    /// Linear loss only
    pub fn linear(linear: Tensor) -> Self {
        Self {
            total: linear.clone(),
            mel: None,
            linear,
        }
    }

    /// Mel + linear loss
    pub fn combined(mel: Tensor, linear: Tensor) -> Result<Self> {
        let total = (&mel + &linear)?;
        Ok(Self {
            total,
            mel: Some(mel),
            linear,
        })
    }

    /// Read the scalars
    pub fn values(&self) -> Result<LossValues> {
        let mel = match &self.mel {
            Some(mel) => Some(mel.to_scalar::<f32>()?),
            None => None,
        };
        Ok(LossValues {
            total: self.total.to_scalar::<f32>()?,
            mel,
            linear: self.linear.to_scalar::<f32>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_l1_loss() {
        let device = Device::Cpu;
        let a = Tensor::new(&[[0.0f32, 1.0], [2.0, 3.0]], &device).unwrap();
        let b = Tensor::new(&[[1.0f32, 1.0], [0.0, 3.0]], &device).unwrap();
        let loss = l1_loss(&a, &b).unwrap().to_scalar::<f32>().unwrap();
        assert!((loss - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_combined_values() {
        let device = Device::Cpu;
        let mel = Tensor::new(0.25f32, &device).unwrap();
        let linear = Tensor::new(0.5f32, &device).unwrap();
        let values = Loss::combined(mel, linear).unwrap().values().unwrap();
        assert_eq!(values.mel, Some(0.25));
        assert_eq!(values.linear, 0.5);
        assert!((values.total - 0.75).abs() < 1e-6);
    }
}
