//! Hyperparameter configuration
//!
//! A single immutable record loaded from YAML at the start of a run and
//! shared by reference with every component. Every section falls back to
//! its defaults, so a config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::conversion::ms_to_samples;
use crate::error::{Result, TacotronError};

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Signal processing parameters
    pub audio: AudioParams,
    /// Network widths, depths and training parameters
    pub model: ModelParams,
    /// Vocabulary and spectrogram normalization constants
    pub dataset: DatasetParams,
    /// Checkpoint and synthesis paths
    pub inference: InferenceParams,
}

/// Signal processing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    /// Sampling rate in Hz
    pub sampling_rate: u32,
    /// FFT size
    pub n_fft: usize,
    /// Analysis window length in milliseconds
    pub win_len_ms: f32,
    /// Hop between windows in milliseconds
    pub win_hop_ms: f32,
    /// Number of mel bands
    pub n_mels: usize,
    /// Lowest frequency covered by the mel filterbank, Hz
    pub mel_fmin: f32,
    /// Highest frequency covered by the mel filterbank, Hz. Defaults to Nyquist.
    pub mel_fmax: Option<f32>,
    /// Griffin-Lim iteration count
    pub reconstruction_iterations: usize,
    /// Exponent applied to magnitudes before reconstruction (1.0 = off)
    pub power: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sampling_rate: 22050,
            n_fft: 2048,
            win_len_ms: 50.0,
            win_hop_ms: 12.5,
            n_mels: 80,
            mel_fmin: 0.0,
            mel_fmax: None,
            reconstruction_iterations: 50,
            power: 1.2,
        }
    }
}

/// Parameters of one CBHG block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CbhgParams {
    /// Number of convolutions in the bank (kernel widths 1..=n_banks)
    pub n_banks: usize,
    /// Filters per bank convolution
    pub n_filters: usize,
    /// Channels of the first projection convolution
    pub n_proj_filters: usize,
    /// Number of highway layers
    pub n_highway_layers: usize,
    /// Highway layer width
    pub n_highway_units: usize,
    /// GRU units per direction
    pub n_gru_units: usize,
}

impl Default for CbhgParams {
    fn default() -> Self {
        Self {
            n_banks: 16,
            n_filters: 128,
            n_proj_filters: 128,
            n_highway_layers: 4,
            n_highway_units: 128,
            n_gru_units: 128,
        }
    }
}

/// Model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Frames predicted per decoder step
    pub reduction: usize,
    /// Character embedding width
    pub embedding_size: usize,
    /// Encoder prenet layer widths
    pub encoder_prenet: Vec<usize>,
    /// Encoder CBHG
    pub encoder: CbhgParams,
    /// Decoder prenet layer widths
    pub decoder_prenet: Vec<usize>,
    /// Additive attention width
    pub attention_units: usize,
    /// Attention GRU width
    pub attention_rnn_units: usize,
    /// Residual decoder GRU width
    pub decoder_rnn_units: usize,
    /// Number of residual decoder GRUs
    pub n_decoder_rnn_layers: usize,
    /// Decoder steps run in prediction mode
    pub max_decoder_iterations: usize,
    /// Prenet dropout probability (training only)
    pub dropout: f32,
    /// Post-processing CBHG
    pub post: CbhgParams,
    /// AdamW learning rate
    pub learning_rate: f64,
    /// Save a checkpoint every N training steps (0 = never)
    pub checkpoint_every: usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            reduction: 5,
            embedding_size: 256,
            encoder_prenet: vec![256, 128],
            encoder: CbhgParams::default(),
            decoder_prenet: vec![256, 128],
            attention_units: 256,
            attention_rnn_units: 256,
            decoder_rnn_units: 256,
            n_decoder_rnn_layers: 2,
            max_decoder_iterations: 200,
            dropout: 0.5,
            post: CbhgParams {
                n_banks: 8,
                n_filters: 128,
                n_proj_filters: 256,
                n_highway_layers: 4,
                n_highway_units: 128,
                n_gru_units: 128,
            },
            learning_rate: 1e-3,
            checkpoint_every: 1000,
        }
    }
}

/// Decibel normalization constants of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecibelNormalization {
    /// Reference level subtracted before normalization
    pub ref_db: f32,
    /// Dynamic range mapped onto [0, 1]
    pub max_db: f32,
}

/// Dataset-derived constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetParams {
    /// Characters of the vocabulary, in id order after the reserved tokens
    pub vocabulary: String,
    /// Normalization of mel spectrograms
    pub mel: DecibelNormalization,
    /// Normalization of linear spectrograms
    pub linear: DecibelNormalization,
}

impl Default for DatasetParams {
    fn default() -> Self {
        Self {
            vocabulary: crate::text::DEFAULT_CHARACTERS.to_string(),
            mel: DecibelNormalization { ref_db: 20.0, max_db: 100.0 },
            linear: DecibelNormalization { ref_db: 20.0, max_db: 100.0 },
        }
    }
}

/// How synthesized files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileNaming {
    /// `0000.wav`, `0001.wav`, ...
    Index,
    /// Sanitized sentence text
    #[default]
    Text,
}

/// Checkpoint and synthesis paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceParams {
    /// Root folder of all runs
    pub checkpoint_dir: PathBuf,
    /// Run to restore parameters from
    pub checkpoint_load_run: String,
    /// Run to write inference summaries into
    pub checkpoint_save_run: String,
    /// Existing folder receiving the WAV files
    pub synthesis_dir: PathBuf,
    /// Optional text file with one sentence per line
    pub synthesis_file: Option<PathBuf>,
    /// Output file naming scheme
    pub file_naming: FileNaming,
    /// Peak-normalize waveforms before writing
    pub normalize_output: bool,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("checkpoints"),
            checkpoint_load_run: "train".to_string(),
            checkpoint_save_run: "inference".to_string(),
            synthesis_dir: PathBuf::from("synthesis"),
            synthesis_file: None,
            file_naming: FileNaming::Text,
            normalize_output: true,
        }
    }
}

impl Config {
    /// Load a config from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject degenerate or inconsistent values
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        let model = &self.model;

        if audio.n_fft == 0 || audio.n_fft % 2 != 0 {
            return Err(config_error(format!(
                "n_fft must be even and positive, got {}",
                audio.n_fft
            )));
        }
        if audio.sampling_rate == 0 {
            return Err(config_error("sampling_rate must be positive"));
        }
        let win = self.win_length();
        let hop = self.hop_length();
        if hop == 0 || win == 0 {
            return Err(config_error(format!(
                "window ({}) and hop ({}) must span at least one sample",
                win, hop
            )));
        }
        if hop > win {
            return Err(config_error(format!("hop length {} exceeds window length {}", hop, win)));
        }
        if win > audio.n_fft {
            return Err(config_error(format!(
                "window length {} exceeds n_fft {}",
                win, audio.n_fft
            )));
        }
        if audio.n_mels == 0 {
            return Err(config_error("n_mels must be positive"));
        }
        let (fmin, fmax) = self.mel_range();
        if !(fmin >= 0.0 && fmin < fmax && fmax <= audio.sampling_rate as f32 / 2.0) {
            return Err(config_error(format!(
                "mel range {}..{} Hz must lie within 0..Nyquist",
                fmin, fmax
            )));
        }
        if !(audio.power > 0.0) {
            return Err(config_error("power must be positive"));
        }
        if model.reduction == 0 {
            return Err(config_error("reduction factor must be positive"));
        }
        if !(0.0..1.0).contains(&model.dropout) {
            return Err(config_error(format!("dropout must be in [0, 1), got {}", model.dropout)));
        }
        if model.encoder_prenet.is_empty() || model.decoder_prenet.is_empty() {
            return Err(config_error("prenets need at least one layer"));
        }
        for (name, cbhg) in [("encoder", &model.encoder), ("post", &model.post)] {
            if cbhg.n_banks == 0 || cbhg.n_filters == 0 || cbhg.n_proj_filters == 0 {
                return Err(config_error(format!("{} CBHG needs banks and filters", name)));
            }
            if cbhg.n_highway_units == 0 || cbhg.n_gru_units == 0 {
                return Err(config_error(format!("{} CBHG needs highway and GRU units", name)));
            }
        }
        if self.dataset.mel.max_db <= 0.0 || self.dataset.linear.max_db <= 0.0 {
            return Err(config_error("max_db must be positive"));
        }
        if self.inference.checkpoint_load_run == self.inference.checkpoint_save_run {
            return Err(config_error(
                "checkpoint_save_run must differ from checkpoint_load_run",
            ));
        }
        Ok(())
    }

    /// Frequency span of the mel filterbank in Hz
    pub fn mel_range(&self) -> (f32, f32) {
        let nyquist = self.audio.sampling_rate as f32 / 2.0;
        (self.audio.mel_fmin, self.audio.mel_fmax.unwrap_or(nyquist))
    }

    /// Window length in samples
    pub fn win_length(&self) -> usize {
        ms_to_samples(self.audio.win_len_ms, self.audio.sampling_rate)
    }

    /// Hop length in samples
    pub fn hop_length(&self) -> usize {
        ms_to_samples(self.audio.win_hop_ms, self.audio.sampling_rate)
    }

    /// Frequency bins of a linear spectrogram frame
    pub fn n_freq(&self) -> usize {
        1 + self.audio.n_fft / 2
    }

    /// Width of one reduced linear frame group
    pub fn linear_width(&self) -> usize {
        self.n_freq() * self.model.reduction
    }

    /// Width of one reduced mel frame group
    pub fn mel_width(&self) -> usize {
        self.audio.n_mels * self.model.reduction
    }

    /// Directory parameters are restored from
    pub fn load_run_dir(&self) -> PathBuf {
        self.inference.checkpoint_dir.join(&self.inference.checkpoint_load_run)
    }

    /// Directory inference summaries are written to
    pub fn save_run_dir(&self) -> PathBuf {
        self.inference.checkpoint_dir.join(&self.inference.checkpoint_save_run)
    }
}

fn config_error(msg: impl Into<String>) -> TacotronError {
    TacotronError::Config(msg.into())
}
