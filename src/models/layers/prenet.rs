//! Prenet: stacked dense + ReLU layers with dropout

use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};

use crate::error::Result;

/// Bottleneck applied to encoder embeddings and decoder input frames
pub struct Prenet {
    layers: Vec<Linear>,
    dropout: f32,
    out_dim: usize,
}

impl Prenet {
    /// Create a prenet with the given layer widths
    pub fn new(in_dim: usize, sizes: &[usize], dropout: f32, vb: VarBuilder) -> Result<Self> {
        let mut layers = Vec::with_capacity(sizes.len());
        let mut prev = in_dim;
        for (i, &size) in sizes.iter().enumerate() {
            layers.push(candle_nn::linear(prev, size, vb.pp(format!("dense_{}", i + 1)))?);
            prev = size;
        }
        Ok(Self {
            layers,
            dropout,
            out_dim: prev,
        })
    }

    /// Output width
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// x: (..., in_dim) -> (..., out_dim); dropout only when `train`
    pub fn forward(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let mut x = x.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?.relu()?;
            if train && self.dropout > 0.0 {
                x = candle_nn::ops::dropout(&x, self.dropout)?;
            }
        }
        Ok(x)
    }
}
