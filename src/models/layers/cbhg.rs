//! CBHG: convolution bank + highway network + bidirectional GRU
//!
//! Architecture:
//! - Conv bank (widths 1..=K) with batch norm
//! - Max pool over time, width 2, stride 1
//! - Two projection convolutions, residual add back to the block input
//! - Optional dense projection to the highway width
//! - Highway stack
//! - Bidirectional GRU
//!
//! The time axis is preserved end to end.

use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};

use super::conv::BatchNormConv1d;
use super::conv_bank::ConvBank;
use super::highway::Highway;
use super::rnn::BiGru;
use crate::config::CbhgParams;
use crate::error::{Result, TacotronError};

/// Kernel width of both projection convolutions
const PROJECTION_KERNEL: usize = 3;

/// CBHG block
pub struct Cbhg {
    in_channels: usize,
    bank: ConvBank,
    projection_1: BatchNormConv1d,
    projection_2: BatchNormConv1d,
    pre_highway: Option<Linear>,
    highways: Vec<Highway>,
    gru: BiGru,
}

impl Cbhg {
    /// Create a CBHG over `in_channels` features.
    ///
    /// `highway_units` overrides `params.n_highway_units` so callers can scale
    /// the width (the post-processing net multiplies it by the reduction factor).
    pub fn new(
        in_channels: usize,
        params: &CbhgParams,
        highway_units: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let bank =
            ConvBank::new(in_channels, params.n_banks, params.n_filters, vb.pp("conv_bank"))?;
        let projection_1 = BatchNormConv1d::new(
            bank.out_channels(),
            params.n_proj_filters,
            PROJECTION_KERNEL,
            true,
            vb.pp("proj_1"),
        )?;
        let projection_2 = BatchNormConv1d::new(
            params.n_proj_filters,
            in_channels,
            PROJECTION_KERNEL,
            false,
            vb.pp("proj_2"),
        )?;

        let pre_highway = if in_channels != highway_units {
            Some(candle_nn::linear(in_channels, highway_units, vb.pp("pre_highway"))?)
        } else {
            None
        };

        let highways = (0..params.n_highway_layers)
            .map(|i| Highway::new(highway_units, vb.pp(format!("highway_{}", i))))
            .collect::<Result<Vec<_>>>()?;

        let gru = BiGru::new(highway_units, params.n_gru_units, vb.pp("gru"))?;

        Ok(Self {
            in_channels,
            bank,
            projection_1,
            projection_2,
            pre_highway,
            highways,
            gru,
        })
    }

    /// Output feature width
    pub fn out_dim(&self) -> usize {
        self.gru.out_dim()
    }

    /// x: (batch, time, in_channels) -> (batch, time, 2 * n_gru_units)
    pub fn forward(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let (_, _, channels) = x.dims3()?;
        if channels != self.in_channels {
            return Err(TacotronError::shape("Cbhg::forward", self.in_channels, channels));
        }

        // Convolutions run channel-major: (batch, channels, time)
        let xt = x.transpose(1, 2)?.contiguous()?;
        let bank = self.bank.forward(&xt, train)?;
        let pooled = max_pool_same(&bank)?;
        let projected = self.projection_1.forward(&pooled, train)?;
        let projected = self.projection_2.forward(&projected, train)?;
        let residual = (projected + &xt)?;

        let mut h = residual.transpose(1, 2)?.contiguous()?;
        if let Some(ref pre) = self.pre_highway {
            h = pre.forward(&h)?;
        }
        for highway in &self.highways {
            h = highway.forward(&h)?;
        }

        self.gru.forward(&h)
    }
}

/// Max pool of width 2 and stride 1 over the last axis, keeping its length.
/// The final step is compared with a copy of itself.
pub fn max_pool_same(x: &Tensor) -> Result<Tensor> {
    let time = x.dim(2)?;
    let padded = x.pad_with_same(2, 0, 1)?;
    let left = padded.narrow(2, 0, time)?;
    let right = padded.narrow(2, 1, time)?;
    Ok(left.maximum(&right)?)
}
