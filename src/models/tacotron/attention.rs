//! Additive (Bahdanau) attention over encoder outputs

use candle_core::{Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};

use crate::error::{Result, TacotronError};

/// Score given to padding positions before the softmax
const MASK_VALUE: f32 = -1e9;

/// `score = v^T tanh(W_m m + W_q q)`
pub struct BahdanauAttention {
    query_layer: Linear,
    memory_layer: Linear,
    v: Linear,
}

impl BahdanauAttention {
    /// Create the attention mechanism
    pub fn new(query_dim: usize, memory_dim: usize, units: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            query_layer: candle_nn::linear_no_bias(query_dim, units, vb.pp("query_layer"))?,
            memory_layer: candle_nn::linear_no_bias(memory_dim, units, vb.pp("memory_layer"))?,
            v: candle_nn::linear_no_bias(units, 1, vb.pp("v"))?,
        })
    }

    /// Project the memory once per utterance: (batch, len, dim) -> (batch, len, units)
    pub fn keys(&self, memory: &Tensor) -> Result<Tensor> {
        Ok(self.memory_layer.forward(memory)?)
    }

    /// One attention step.
    ///
    /// # Arguments
    /// * `query` - (batch, query_dim)
    /// * `keys` - Output of [`Self::keys`]
    /// * `memory` - (batch, len, memory_dim)
    /// * `mask` - (batch, len) u8, 1 for valid positions
    ///
    /// # Returns
    /// * context (batch, memory_dim) and weights (batch, len)
    pub fn forward(
        &self,
        query: &Tensor,
        keys: &Tensor,
        memory: &Tensor,
        mask: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let q = self.query_layer.forward(query)?.unsqueeze(1)?;
        let energy = keys.broadcast_add(&q)?.tanh()?;
        let scores = self.v.forward(&energy)?.squeeze(2)?;

        let masked_value = Tensor::full(MASK_VALUE, scores.shape(), scores.device())?;
        let scores = mask.where_cond(&scores, &masked_value)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;

        let context = weights.unsqueeze(1)?.matmul(memory)?.squeeze(1)?;
        Ok((context, weights))
    }
}

/// (batch, max_len) u8 mask with ones on the first `lengths[b]` positions
pub fn sequence_mask(lengths: &[usize], max_len: usize, device: &Device) -> Result<Tensor> {
    let mut data = Vec::with_capacity(lengths.len() * max_len);
    for &len in lengths {
        if len > max_len {
            return Err(TacotronError::shape("sequence_mask", format!("<= {}", max_len), len));
        }
        data.extend((0..max_len).map(|i| u8::from(i < len)));
    }
    Ok(Tensor::from_vec(data, (lengths.len(), max_len), device)?)
}
