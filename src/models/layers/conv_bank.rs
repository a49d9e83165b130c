//! Convolutional bank: parallel convolutions of widths 1..=K

use candle_core::Tensor;
use candle_nn::VarBuilder;

use super::conv::BatchNormConv1d;
use crate::error::Result;

/// Bank of `n_banks` convolutions concatenated along the channel axis
pub struct ConvBank {
    convs: Vec<BatchNormConv1d>,
    n_filters: usize,
}

impl ConvBank {
    /// Create a bank over `in_channels` input channels
    pub fn new(
        in_channels: usize,
        n_banks: usize,
        n_filters: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let convs = (1..=n_banks)
            .map(|k| {
                let name = format!("conv1d_{}", k);
                BatchNormConv1d::new(in_channels, n_filters, k, true, vb.pp(name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { convs, n_filters })
    }

    /// Channels of the concatenated output
    pub fn out_channels(&self) -> usize {
        self.convs.len() * self.n_filters
    }

    /// x: (batch, in_channels, time) -> (batch, n_banks * n_filters, time)
    pub fn forward(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let outputs = self
            .convs
            .iter()
            .map(|conv| conv.forward(x, train))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::cat(&outputs, 1)?)
    }
}
