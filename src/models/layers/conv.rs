//! 1D convolutions with "same" padding

use candle_core::Tensor;
use candle_nn::{BatchNorm, BatchNormConfig, Conv1dConfig, Module, ModuleT, VarBuilder};

use crate::error::{Result, TacotronError};

/// Batch norm epsilon used by every convolution block
const BATCH_NORM_EPS: f64 = 1e-3;

/// Conv1d whose output has the same length as its input.
///
/// Even kernels pad one more step on the right than on the left.
pub struct Conv1dSame {
    conv: candle_nn::Conv1d,
    in_channels: usize,
    kernel_size: usize,
}

impl Conv1dSame {
    /// Create a convolution from `in_channels` to `out_channels`
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv1dConfig::default();
        let conv = candle_nn::conv1d(in_channels, out_channels, kernel_size, config, vb)?;
        Ok(Self {
            conv,
            in_channels,
            kernel_size,
        })
    }

    /// x: (batch, in_channels, time) -> (batch, out_channels, time)
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_, channels, _) = x.dims3()?;
        if channels != self.in_channels {
            return Err(TacotronError::shape("Conv1dSame::forward", self.in_channels, channels));
        }
        let left = (self.kernel_size - 1) / 2;
        let right = self.kernel_size - 1 - left;
        let x = x.pad_with_zeros(2, left, right)?;
        Ok(self.conv.forward(&x)?)
    }
}

/// Convolution, optional ReLU, then batch normalization
pub struct BatchNormConv1d {
    conv: Conv1dSame,
    batch_norm: BatchNorm,
    relu: bool,
}

impl BatchNormConv1d {
    /// Create the block
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        relu: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let conv = Conv1dSame::new(in_channels, out_channels, kernel_size, vb.pp("conv"))?;
        let config = BatchNormConfig {
            eps: BATCH_NORM_EPS,
            ..Default::default()
        };
        let batch_norm = candle_nn::batch_norm(out_channels, config, vb.pp("batch_norm"))?;
        Ok(Self {
            conv,
            batch_norm,
            relu,
        })
    }

    /// x: (batch, channels, time).
    ///
    /// `train` selects batch statistics (and updates the running averages);
    /// otherwise the stored running statistics are used.
    pub fn forward(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let x = self.conv.forward(x)?;
        let x = if self.relu { x.relu()? } else { x };
        Ok(self.batch_norm.forward_t(&x, train)?)
    }
}
