//! Character encoder: embedding -> prenet -> CBHG

use candle_core::Tensor;
use candle_nn::{Embedding, Module, VarBuilder};

use crate::config::Config;
use crate::error::Result;
use crate::models::layers::{Cbhg, Prenet};

/// Tacotron encoder
pub struct Encoder {
    embedding: Embedding,
    prenet: Prenet,
    cbhg: Cbhg,
}

impl Encoder {
    /// Create the encoder for a vocabulary of `vocab_size` ids
    pub fn new(config: &Config, vocab_size: usize, vb: VarBuilder) -> Result<Self> {
        let model = &config.model;
        let embedding = candle_nn::embedding(vocab_size, model.embedding_size, vb.pp("embedding"))?;
        let prenet = Prenet::new(
            model.embedding_size,
            &model.encoder_prenet,
            model.dropout,
            vb.pp("prenet"),
        )?;
        let cbhg = Cbhg::new(
            prenet.out_dim(),
            &model.encoder,
            model.encoder.n_highway_units,
            vb.pp("cbhg"),
        )?;
        Ok(Self {
            embedding,
            prenet,
            cbhg,
        })
    }

    /// Width of the encoder outputs
    pub fn out_dim(&self) -> usize {
        self.cbhg.out_dim()
    }

    /// ids: (batch, len) u32 -> (batch, len, out_dim)
    pub fn forward(&self, ids: &Tensor, train: bool) -> Result<Tensor> {
        let embedded = self.embedding.forward(ids)?;
        let x = self.prenet.forward(&embedded, train)?;
        self.cbhg.forward(&x, train)
    }
}
