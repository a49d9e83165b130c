//! Tacotron model: encoder, attention decoder and post-processing net
//!
//! Parameters are created once in [`Tacotron::new`]. [`Tacotron::build`]
//! runs one graph over a batch in the requested [`Mode`]; only TRAIN turns
//! on dropout and batch statistics, only TRAIN and EVAL compute a loss.

use std::fmt;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use tracing::debug;

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::loss::{l1_loss, Loss};
use super::post_process::PostProcess;
use crate::audio::{AnalyzedAudio, Spectrogram};
use crate::config::Config;
use crate::error::{Result, TacotronError};
use crate::text::Vocabulary;

/// Which part of the graph runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Loss, dropout and batch statistics
    Train,
    /// Loss with inference-time layers
    Eval,
    /// Prediction only
    Predict,
}

impl Mode {
    /// Whether stochastic regularization and batch statistics are active
    pub fn is_training(self) -> bool {
        matches!(self, Mode::Train)
    }

    /// Whether the graph computes a loss (and therefore needs targets)
    pub fn needs_targets(self) -> bool {
        !matches!(self, Mode::Predict)
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Eval => "eval",
            Mode::Predict => "predict",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reduced ground-truth spectrograms of a sentence batch
pub struct Targets {
    /// (batch, steps, n_mels * r)
    pub mel: Tensor,
    /// (batch, steps, n_freq * r)
    pub linear: Tensor,
}

impl Targets {
    /// Reduce analyzed utterances by `reduction` and zero-pad them to the
    /// longest one
    pub fn from_analyzed(
        items: &[AnalyzedAudio],
        reduction: usize,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            mel: stack_reduced(items.iter().map(|a| &a.mel), reduction, device)?,
            linear: stack_reduced(items.iter().map(|a| &a.linear), reduction, device)?,
        })
    }

    /// Decoder steps covered by the targets
    pub fn steps(&self) -> Result<usize> {
        Ok(self.mel.dim(1)?)
    }
}

fn stack_reduced<'a>(
    specs: impl Iterator<Item = &'a Spectrogram>,
    reduction: usize,
    device: &Device,
) -> Result<Tensor> {
    let folded = specs.map(|s| s.fold(reduction)).collect::<Result<Vec<_>>>()?;
    let steps = folded.iter().map(Spectrogram::frames).max().unwrap_or(0);
    let width = folded.first().map(Spectrogram::bins).unwrap_or(0);
    if steps == 0 || width == 0 {
        return Err(TacotronError::shape(
            "Targets::from_analyzed",
            "non-empty spectrograms",
            (steps, width),
        ));
    }

    let mut data = Vec::with_capacity(folded.len() * steps * width);
    for spec in &folded {
        if spec.bins() != width {
            return Err(TacotronError::shape("Targets::from_analyzed", width, spec.bins()));
        }
        data.extend_from_slice(spec.data());
        data.resize(data.len() + (steps - spec.frames()) * width, 0.0);
    }
    Ok(Tensor::from_vec(data, (folded.len(), steps, width), device)?)
}

/// Model inputs
pub enum Inputs {
    /// Normalized mel spectrograms, post-processing only
    Spectrogram {
        /// (batch, steps, n_mels * r)
        mel: Tensor,
        /// (batch, steps, n_freq * r)
        linear: Option<Tensor>,
        /// Valid steps per item
        seq_lengths: Vec<usize>,
    },
    /// Padded id sequences through the full model
    Sentences {
        /// (batch, len) u32
        ids: Tensor,
        /// Unpadded length per item
        seq_lengths: Vec<usize>,
        /// Required in TRAIN and EVAL
        targets: Option<Targets>,
    },
}

impl Inputs {
    fn has_targets(&self) -> bool {
        match self {
            Inputs::Spectrogram { linear, .. } => linear.is_some(),
            Inputs::Sentences { targets, .. } => targets.is_some(),
        }
    }
}

/// Tensors produced by one graph run
pub struct Graph {
    /// Mode the graph ran in
    pub mode: Mode,
    /// Decoder mel output (sentence inputs only)
    pub mel: Option<Tensor>,
    /// Predicted normalized linear spectrogram (batch, steps, n_freq * r)
    pub linear: Tensor,
    /// Attention weights (batch, steps, len), sentence inputs only
    pub alignments: Option<Tensor>,
    /// Target linear spectrogram when one was supplied
    pub target_linear: Option<Tensor>,
    /// Absent in PREDICT
    pub loss: Option<Loss>,
    /// Bins per unreduced frame
    pub n_freq: usize,
}

/// Tacotron
pub struct Tacotron {
    encoder: Encoder,
    decoder: Decoder,
    post: PostProcess,
    vocab_size: usize,
    n_freq: usize,
    reduction: usize,
}

impl Tacotron {
    /// Create every parameter of the model under `vb`
    pub fn new(config: &Config, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let vocab_size = Vocabulary::new(&config.dataset.vocabulary).len();

        let encoder = Encoder::new(config, vocab_size, vb.pp("encoder"))?;
        let decoder = Decoder::new(config, encoder.out_dim(), vb.pp("decoder"))?;
        let post = PostProcess::new(config, vb.pp("post_process"))?;
        debug!(
            "Tacotron created: vocab {}, reduction {}, mel width {}, linear width {}",
            vocab_size,
            config.model.reduction,
            post.in_dim(),
            post.out_dim()
        );

        Ok(Self {
            encoder,
            decoder,
            post,
            vocab_size,
            n_freq: config.n_freq(),
            reduction: config.model.reduction,
        })
    }

    /// Reduction factor
    pub fn reduction(&self) -> usize {
        self.reduction
    }

    /// Map normalized mel frames (batch, steps, n_mels * r) to normalized
    /// linear frames (batch, steps, (1 + n_fft / 2) * r)
    pub fn post_process(&self, mel: &Tensor, mode: Mode) -> Result<Tensor> {
        self.post.forward(mel, mode.is_training())
    }

    /// Run the graph for `mode`.
    ///
    /// Fails with [`TacotronError::MissingTarget`] when TRAIN or EVAL has no
    /// targets, and with [`TacotronError::Shape`] when any input disagrees
    /// with the configured widths.
    pub fn build(&self, inputs: Inputs, mode: Mode) -> Result<Graph> {
        if mode.needs_targets() && !inputs.has_targets() {
            return Err(TacotronError::MissingTarget(mode.name()));
        }
        let train = mode.is_training();

        match inputs {
            Inputs::Spectrogram {
                mel,
                linear,
                seq_lengths,
            } => {
                let (batch, steps) = check_frames("mel input", &mel, self.post.in_dim())?;
                check_lengths(&seq_lengths, batch, steps)?;
                if let Some(ref linear) = linear {
                    let dims = check_frames("linear target", linear, self.post.out_dim())?;
                    if dims != (batch, steps) {
                        return Err(TacotronError::shape("linear target", (batch, steps), dims));
                    }
                }

                let predicted = self.post.forward(&mel, train)?;
                let loss = match (&linear, mode.needs_targets()) {
                    (Some(target), true) => Some(Loss::linear(l1_loss(&predicted, target)?)),
                    _ => None,
                };
                Ok(Graph {
                    mode,
                    mel: None,
                    linear: predicted,
                    alignments: None,
                    target_linear: linear,
                    loss,
                    n_freq: self.n_freq,
                })
            }
            Inputs::Sentences {
                ids,
                seq_lengths,
                targets,
            } => {
                let (batch, len) = ids.dims2()?;
                if ids.dtype() != DType::U32 {
                    return Err(TacotronError::shape("ids dtype", DType::U32, ids.dtype()));
                }
                check_lengths(&seq_lengths, batch, len)?;
                // Predictions never see targets, even when supplied
                let targets = if mode.needs_targets() { targets } else { None };
                if let Some(ref t) = targets {
                    let mel_dims = check_frames("mel target", &t.mel, self.post.in_dim())?;
                    let linear_dims =
                        check_frames("linear target", &t.linear, self.post.out_dim())?;
                    if mel_dims.0 != batch || mel_dims != linear_dims {
                        let expected = (batch, mel_dims.1);
                        return Err(TacotronError::shape("targets", expected, linear_dims));
                    }
                }

                let memory = self.encoder.forward(&ids, train)?;
                let decoded = self
                    .decoder
                    .forward(&memory, &seq_lengths, targets.as_ref().map(|t| &t.mel), train)?;
                let predicted = self.post.forward(&decoded.frames, train)?;

                let loss = match targets {
                    Some(ref t) => Some(Loss::combined(
                        l1_loss(&decoded.frames, &t.mel)?,
                        l1_loss(&predicted, &t.linear)?,
                    )?),
                    None => None,
                };
                Ok(Graph {
                    mode,
                    mel: Some(decoded.frames),
                    linear: predicted,
                    alignments: Some(decoded.alignments),
                    target_linear: targets.map(|t| t.linear),
                    loss,
                    n_freq: self.n_freq,
                })
            }
        }
    }

    /// Size of the embedding table
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}

/// Check a (batch, steps, width) tensor, returning (batch, steps)
fn check_frames(context: &'static str, t: &Tensor, width: usize) -> Result<(usize, usize)> {
    let (batch, steps, actual) = t.dims3()?;
    if actual != width {
        return Err(TacotronError::shape(context, width, actual));
    }
    if batch == 0 || steps == 0 {
        return Err(TacotronError::shape(context, "non-empty batch and time axes", (batch, steps)));
    }
    Ok((batch, steps))
}

fn check_lengths(lengths: &[usize], batch: usize, max_len: usize) -> Result<()> {
    if lengths.len() != batch {
        return Err(TacotronError::shape("seq_lengths", batch, lengths.len()));
    }
    if let Some(&bad) = lengths.iter().find(|&&l| l == 0 || l > max_len) {
        return Err(TacotronError::shape("seq_lengths", format!("1..={}", max_len), bad));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CbhgParams;
    use candle_core::Device;
    use candle_nn::VarMap;

    fn small_cbhg() -> CbhgParams {
        CbhgParams {
            n_banks: 2,
            n_filters: 4,
            n_proj_filters: 8,
            n_highway_layers: 1,
            n_highway_units: 6,
            n_gru_units: 5,
        }
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.audio.n_fft = 16;
        config.audio.sampling_rate = 800;
        config.audio.win_len_ms = 20.0;
        config.audio.win_hop_ms = 5.0;
        config.audio.n_mels = 4;
        config.model.reduction = 2;
        config.model.embedding_size = 8;
        config.model.encoder_prenet = vec![8, 6];
        config.model.encoder = small_cbhg();
        config.model.decoder_prenet = vec![8, 4];
        config.model.attention_units = 6;
        config.model.attention_rnn_units = 6;
        config.model.decoder_rnn_units = 6;
        config.model.n_decoder_rnn_layers = 1;
        config.model.max_decoder_iterations = 3;
        config.model.post = small_cbhg();
        config
    }

    fn model(config: &Config) -> (VarMap, Tacotron) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = Tacotron::new(config, vb).unwrap();
        (varmap, model)
    }

    fn spectrogram_inputs(config: &Config, with_target: bool) -> Inputs {
        let device = Device::Cpu;
        let mel = Tensor::rand(0.0f32, 1.0, (2, 5, config.mel_width()), &device).unwrap();
        let linear = with_target
            .then(|| Tensor::rand(0.0f32, 1.0, (2, 5, config.linear_width()), &device).unwrap());
        Inputs::Spectrogram {
            mel,
            linear,
            seq_lengths: vec![5, 3],
        }
    }

    #[test]
    fn test_post_process_width() {
        let config = small_config();
        let (_, model) = model(&config);
        let mel = Tensor::rand(0.0f32, 1.0, (3, 7, config.mel_width()), &Device::Cpu).unwrap();
        let linear = model.post_process(&mel, Mode::Predict).unwrap();
        assert_eq!(linear.dims3().unwrap(), (3, 7, 9 * 2));
    }

    #[test]
    fn test_predict_has_no_loss() {
        let config = small_config();
        let (_, model) = model(&config);
        let graph = model.build(spectrogram_inputs(&config, false), Mode::Predict).unwrap();
        assert!(graph.loss.is_none());
        assert_eq!(graph.linear.dims3().unwrap(), (2, 5, config.linear_width()));
    }

    #[test]
    fn test_train_requires_target() {
        let config = small_config();
        let (_, model) = model(&config);
        for mode in [Mode::Train, Mode::Eval] {
            let result = model.build(spectrogram_inputs(&config, false), mode);
            assert!(matches!(result, Err(TacotronError::MissingTarget(_))));
        }
    }

    #[test]
    fn test_eval_loss_matches_l1() {
        let config = small_config();
        let (_, model) = model(&config);
        let graph = model.build(spectrogram_inputs(&config, true), Mode::Eval).unwrap();
        let loss = graph.loss.as_ref().unwrap().values().unwrap();
        let target = graph.target_linear.as_ref().unwrap();
        let expected = l1_loss(&graph.linear, target).unwrap().to_scalar::<f32>().unwrap();
        assert!((loss.linear - expected).abs() < 1e-6);
        assert!(loss.mel.is_none());
    }

    #[test]
    fn test_width_mismatch_fails() {
        let config = small_config();
        let (_, model) = model(&config);
        let mel = Tensor::zeros((1, 4, config.mel_width() + 1), DType::F32, &Device::Cpu).unwrap();
        let inputs = Inputs::Spectrogram {
            mel,
            linear: None,
            seq_lengths: vec![4],
        };
        assert!(matches!(model.build(inputs, Mode::Predict), Err(TacotronError::Shape { .. })));
    }

    #[test]
    fn test_sentences_predict_runs_max_iterations() {
        let config = small_config();
        let (_, model) = model(&config);
        let ids = Tensor::new(&[[3u32, 4, 5, 1], [6, 1, 0, 0]], &Device::Cpu).unwrap();
        let inputs = Inputs::Sentences {
            ids,
            seq_lengths: vec![4, 2],
            targets: None,
        };
        let graph = model.build(inputs, Mode::Predict).unwrap();
        assert_eq!(graph.linear.dims3().unwrap(), (2, 3, config.linear_width()));
        assert_eq!(graph.alignments.unwrap().dims3().unwrap(), (2, 3, 4));
    }

    #[test]
    fn test_sentences_train_reports_both_losses() {
        let config = small_config();
        let (_, model) = model(&config);
        let device = Device::Cpu;
        let ids = Tensor::new(&[[3u32, 4, 1]], &device).unwrap();
        let targets = Targets {
            mel: Tensor::rand(0.0f32, 1.0, (1, 6, config.mel_width()), &device).unwrap(),
            linear: Tensor::rand(0.0f32, 1.0, (1, 6, config.linear_width()), &device).unwrap(),
        };
        let inputs = Inputs::Sentences {
            ids,
            seq_lengths: vec![3],
            targets: Some(targets),
        };
        let graph = model.build(inputs, Mode::Train).unwrap();
        let values = graph.loss.unwrap().values().unwrap();
        let mel = values.mel.unwrap();
        assert!((values.total - (mel + values.linear)).abs() < 1e-5);
    }

    #[test]
    fn test_targets_from_analyzed_pad_to_longest() {
        let spec = |frames: usize, bins: usize| {
            Spectrogram::new(frames, bins, vec![1.0; frames * bins]).unwrap()
        };
        let items = vec![
            AnalyzedAudio { mel: spec(5, 4), linear: spec(5, 9) },
            AnalyzedAudio { mel: spec(2, 4), linear: spec(2, 9) },
        ];
        let targets = Targets::from_analyzed(&items, 2, &Device::Cpu).unwrap();
        assert_eq!(targets.mel.dims3().unwrap(), (2, 3, 8));
        assert_eq!(targets.linear.dims3().unwrap(), (2, 3, 18));
        assert_eq!(targets.steps().unwrap(), 3);

        let short: Vec<Vec<f32>> = targets.mel.get(1).unwrap().to_vec2().unwrap();
        assert_eq!(short[0], vec![1.0; 8]);
        assert_eq!(short[1], vec![0.0; 8]);
    }

    #[test]
    fn test_sequence_lengths_checked() {
        let config = small_config();
        let (_, model) = model(&config);
        let ids = Tensor::new(&[[3u32, 4, 1]], &Device::Cpu).unwrap();
        let inputs = Inputs::Sentences {
            ids,
            seq_lengths: vec![4],
            targets: None,
        };
        assert!(matches!(model.build(inputs, Mode::Predict), Err(TacotronError::Shape { .. })));
    }
}
