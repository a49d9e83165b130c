//! Mel -> linear spectrogram post-processing net

use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};

use crate::config::Config;
use crate::error::{Result, TacotronError};
use crate::models::layers::Cbhg;

/// CBHG over reduced mel frames followed by a dense projection to reduced
/// linear frames. Operates on whole sequences, the time axis is untouched.
pub struct PostProcess {
    cbhg: Cbhg,
    projection: Linear,
    in_dim: usize,
    out_dim: usize,
}

impl PostProcess {
    /// Create the post-processing net
    pub fn new(config: &Config, vb: VarBuilder) -> Result<Self> {
        let in_dim = config.mel_width();
        let out_dim = config.linear_width();
        let params = &config.model.post;
        let highway_units = params.n_highway_units * config.model.reduction;

        let cbhg = Cbhg::new(in_dim, params, highway_units, vb.pp("cbhg"))?;
        let projection = candle_nn::linear(cbhg.out_dim(), out_dim, vb.pp("projection"))?;
        Ok(Self {
            cbhg,
            projection,
            in_dim,
            out_dim,
        })
    }

    /// Expected input width, `n_mels * reduction`
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output width, `(1 + n_fft / 2) * reduction`
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// mel: (batch, time, n_mels * r) -> (batch, time, (1 + n_fft / 2) * r)
    pub fn forward(&self, mel: &Tensor, train: bool) -> Result<Tensor> {
        let (_, _, width) = mel.dims3()?;
        if width != self.in_dim {
            return Err(TacotronError::shape("PostProcess::forward", self.in_dim, width));
        }
        let h = self.cbhg.forward(mel, train)?;
        Ok(self.projection.forward(&h)?)
    }
}
