//! Attention decoder producing `reduction` mel frames per step
//!
//! Each step:
//! 1. Prenet over the previous frame (a zero GO frame at step 0)
//! 2. Attention GRU over [prenet output, previous context]
//! 3. Bahdanau attention over the encoder outputs
//! 4. Residual GRU stack over the projected [attention state, context]
//! 5. Linear projection to `n_mels * reduction`
//!
//! With targets the previous frame is the last frame of the previous target
//! group (teacher forcing). Without targets it is the model's own output and
//! the decoder runs for exactly `max_decoder_iterations` steps.

use candle_core::{DType, Tensor};
use candle_nn::rnn::{GRUConfig, GRU, RNN};
use candle_nn::{Linear, Module, VarBuilder};
use tracing::trace;

use super::attention::{sequence_mask, BahdanauAttention};
use crate::config::Config;
use crate::error::{Result, TacotronError};
use crate::models::layers::Prenet;

/// Decoder outputs
pub struct DecoderOutput {
    /// (batch, steps, n_mels * reduction)
    pub frames: Tensor,
    /// (batch, steps, encoder_len)
    pub alignments: Tensor,
}

/// Tacotron attention decoder
pub struct Decoder {
    prenet: Prenet,
    attention_rnn: GRU,
    attention: BahdanauAttention,
    project_input: Linear,
    rnns: Vec<GRU>,
    output: Linear,
    n_mels: usize,
    reduction: usize,
    memory_dim: usize,
    max_iterations: usize,
}

impl Decoder {
    /// Create a decoder attending over `memory_dim` wide encoder outputs
    pub fn new(config: &Config, memory_dim: usize, vb: VarBuilder) -> Result<Self> {
        let model = &config.model;
        let n_mels = config.audio.n_mels;

        let prenet = Prenet::new(n_mels, &model.decoder_prenet, model.dropout, vb.pp("prenet"))?;
        let attention_rnn = candle_nn::rnn::gru(
            prenet.out_dim() + memory_dim,
            model.attention_rnn_units,
            GRUConfig::default(),
            vb.pp("attention_rnn"),
        )?;
        let attention = BahdanauAttention::new(
            model.attention_rnn_units,
            memory_dim,
            model.attention_units,
            vb.pp("attention"),
        )?;
        let project_input = candle_nn::linear(
            model.attention_rnn_units + memory_dim,
            model.decoder_rnn_units,
            vb.pp("project_input"),
        )?;
        let rnns = (0..model.n_decoder_rnn_layers)
            .map(|i| {
                candle_nn::rnn::gru(
                    model.decoder_rnn_units,
                    model.decoder_rnn_units,
                    GRUConfig::default(),
                    vb.pp(format!("decoder_rnn_{}", i)),
                )
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        let output_dim = n_mels * model.reduction;
        let output = candle_nn::linear(model.decoder_rnn_units, output_dim, vb.pp("output"))?;

        Ok(Self {
            prenet,
            attention_rnn,
            attention,
            project_input,
            rnns,
            output,
            n_mels,
            reduction: model.reduction,
            memory_dim,
            max_iterations: model.max_decoder_iterations,
        })
    }

    /// Run the decoder.
    ///
    /// # Arguments
    /// * `memory` - Encoder outputs (batch, len, memory_dim)
    /// * `lengths` - Valid encoder positions per item
    /// * `targets` - Reduced mel targets (batch, steps, n_mels * reduction)
    /// * `train` - Enables prenet dropout
    pub fn forward(
        &self,
        memory: &Tensor,
        lengths: &[usize],
        targets: Option<&Tensor>,
        train: bool,
    ) -> Result<DecoderOutput> {
        let (batch, len, dim) = memory.dims3()?;
        if dim != self.memory_dim {
            return Err(TacotronError::shape("Decoder::forward", self.memory_dim, dim));
        }
        let steps = match targets {
            Some(t) => t.dim(1)?,
            None => self.max_iterations,
        };
        if steps == 0 {
            return Err(TacotronError::shape("Decoder::forward", "at least one step", steps));
        }

        let device = memory.device();
        let memory = memory.contiguous()?;
        let keys = self.attention.keys(&memory)?;
        let mask = sequence_mask(lengths, len, device)?;

        let mut frame = Tensor::zeros((batch, self.n_mels), DType::F32, device)?;
        let mut context = Tensor::zeros((batch, self.memory_dim), DType::F32, device)?;
        let mut attention_state = self.attention_rnn.zero_state(batch)?;
        let mut rnn_states = self
            .rnns
            .iter()
            .map(|rnn| rnn.zero_state(batch))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(steps);
        let mut alignments = Vec::with_capacity(steps);
        let last_frame = (self.reduction - 1) * self.n_mels;

        for step in 0..steps {
            let pre = self.prenet.forward(&frame, train)?;
            let rnn_input = Tensor::cat(&[&pre, &context], 1)?;
            attention_state = self.attention_rnn.step(&rnn_input, &attention_state)?;

            let (new_context, weights) =
                self.attention.forward(attention_state.h(), &keys, &memory, &mask)?;
            context = new_context;

            let mut x = self
                .project_input
                .forward(&Tensor::cat(&[attention_state.h(), &context], 1)?)?;
            for (rnn, state) in self.rnns.iter().zip(rnn_states.iter_mut()) {
                *state = rnn.step(&x, state)?;
                x = (x + state.h())?;
            }
            let out = self.output.forward(&x)?;

            frame = match targets {
                Some(t) => t.narrow(1, step, 1)?.squeeze(1)?.narrow(1, last_frame, self.n_mels)?,
                None => out.narrow(1, last_frame, self.n_mels)?,
            };
            outputs.push(out);
            alignments.push(weights);
        }
        trace!("Decoded {} steps for batch of {}", steps, batch);

        Ok(DecoderOutput {
            frames: Tensor::stack(&outputs, 1)?,
            alignments: Tensor::stack(&alignments, 1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use candle_core::Device;
    use candle_nn::VarMap;

    fn tiny_config() -> Config {
        let mut config = Config::default();
        config.audio.n_mels = 6;
        config.model.reduction = 2;
        config.model.decoder_prenet = vec![8, 4];
        config.model.attention_units = 5;
        config.model.attention_rnn_units = 7;
        config.model.decoder_rnn_units = 9;
        config.model.max_decoder_iterations = 4;
        config
    }

    #[test]
    fn test_decoder_teacher_forced_steps() {
        let device = Device::Cpu;
        let config = tiny_config();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let decoder = Decoder::new(&config, 10, vb).unwrap();

        let memory = Tensor::randn(0.0f32, 1.0, (2, 5, 10), &device).unwrap();
        let targets = Tensor::rand(0.0f32, 1.0, (2, 3, 12), &device).unwrap();
        let out = decoder.forward(&memory, &[5, 2], Some(&targets), true).unwrap();
        assert_eq!(out.frames.dims3().unwrap(), (2, 3, 12));
        assert_eq!(out.alignments.dims3().unwrap(), (2, 3, 5));
    }

    #[test]
    fn test_decoder_free_running_uses_max_iterations() {
        let device = Device::Cpu;
        let config = tiny_config();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let decoder = Decoder::new(&config, 10, vb).unwrap();

        let memory = Tensor::randn(0.0f32, 1.0, (1, 5, 10), &device).unwrap();
        let out = decoder.forward(&memory, &[5], None, false).unwrap();
        assert_eq!(out.frames.dims3().unwrap(), (1, 4, 12));
    }

    #[test]
    fn test_decoder_rejects_memory_width() {
        let device = Device::Cpu;
        let config = tiny_config();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let decoder = Decoder::new(&config, 10, vb).unwrap();

        let memory = Tensor::zeros((1, 5, 11), DType::F32, &device).unwrap();
        assert!(decoder.forward(&memory, &[5], None, false).is_err());
    }
}
