//! Bidirectional GRU

use candle_core::{Device, Tensor};
use candle_nn::rnn::{GRUConfig, GRU, RNN};
use candle_nn::VarBuilder;

use crate::error::{Result, TacotronError};

/// Two GRUs reading the sequence in opposite directions
pub struct BiGru {
    fw: GRU,
    bw: GRU,
    units: usize,
}

impl BiGru {
    /// Create a bidirectional GRU with `units` per direction
    pub fn new(in_dim: usize, units: usize, vb: VarBuilder) -> Result<Self> {
        let fw = candle_nn::rnn::gru(in_dim, units, GRUConfig::default(), vb.pp("fw"))?;
        let bw = candle_nn::rnn::gru(in_dim, units, GRUConfig::default(), vb.pp("bw"))?;
        Ok(Self { fw, bw, units })
    }

    /// Output width (both directions)
    pub fn out_dim(&self) -> usize {
        2 * self.units
    }

    /// x: (batch, time, in_dim) -> (batch, time, 2 * units)
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_, time, _) = x.dims3()?;
        if time == 0 {
            return Err(TacotronError::shape("BiGru::forward", "time > 0", time));
        }

        let fw_states = self.fw.seq(x)?;
        let fw = self.fw.states_to_tensor(&fw_states)?;

        let reversed = reverse_time(x)?;
        let bw_states = self.bw.seq(&reversed)?;
        let bw = reverse_time(&self.bw.states_to_tensor(&bw_states)?)?;

        Ok(Tensor::cat(&[&fw, &bw], 2)?)
    }
}

/// Reverse axis 1 of a (batch, time, features) tensor
pub fn reverse_time(x: &Tensor) -> Result<Tensor> {
    let time = x.dim(1)?;
    let index = reversed_index(time, x.device())?;
    Ok(x.index_select(&index, 1)?)
}

fn reversed_index(len: usize, device: &Device) -> Result<Tensor> {
    let idx: Vec<u32> = (0..len as u32).rev().collect();
    Ok(Tensor::from_vec(idx, len, device)?)
}
