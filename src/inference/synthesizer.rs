//! Inference driver
//!
//! 1. Check the synthesis folder (before any computation)
//! 2. Resolve the checkpoint and restore a session
//! 3. Run the model in PREDICT mode over a padded id batch
//! 4. Record a summary under the save run
//! 5. Reconstruct waveforms with Griffin-Lim and write WAV files

use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use tracing::{debug, info};

use super::checkpoint::{parse_step, CheckpointStore};
use super::session::Session;
use super::summary::SummaryWriter;
use crate::audio::{AudioOutput, Reconstructor, Spectrogram};
use crate::config::Config;
use crate::error::{Result, TacotronError};
use crate::models::{Inputs, Mode};
use crate::text::{output_file_names, PaddedBatch, Vocabulary};

/// Sentences used when neither an input file nor `synthesis_file` is given
pub const DEFAULT_SENTENCES: &[&str] = &[
    "A short sentence.",
    "I can't dance, I can't talk. Only thing about me is the way I walk.",
    "We are the borg, lower your shields and surrender your ships, we will add your \
     biological and technological distinctiveness to our own.",
    "We are the borg resistance is futile.",
    "This sentence           contains many spaces.",
];

/// Raw model output for one sentence
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Normalized linear spectrogram (frames, n_freq), reduction unfolded
    pub linear: Spectrogram,
    /// Number of frames
    pub frames: usize,
}

/// Restored model plus everything needed to turn sentences into audio
pub struct Synthesizer {
    config: Config,
    vocabulary: Vocabulary,
    session: Session,
    summary: SummaryWriter,
    reconstructor: Reconstructor,
    step: usize,
}

impl Synthesizer {
    /// Open a synthesizer.
    ///
    /// # Arguments
    /// * `config` - Validated hyperparameters
    /// * `device` - Compute device
    /// * `checkpoint` - Explicit snapshot, or `None` for the latest one in the load run
    ///
    /// # Errors
    /// [`TacotronError::MissingOutputDir`] if `synthesis_dir` does not exist,
    /// [`TacotronError::NoCheckpoint`] if no snapshot can be resolved.
    pub fn new(config: &Config, device: Device, checkpoint: Option<&Path>) -> Result<Self> {
        config.validate()?;
        let synthesis_dir = &config.inference.synthesis_dir;
        if !synthesis_dir.is_dir() {
            return Err(TacotronError::MissingOutputDir(synthesis_dir.clone()));
        }

        let store = CheckpointStore::new(config.load_run_dir());
        let checkpoint = store.resolve(checkpoint)?;
        let step = parse_step(&checkpoint).unwrap_or(0);

        let summary = SummaryWriter::create(config.save_run_dir())?;
        let reconstructor = Reconstructor::new(config)?;
        let session = Session::restore(config, device, &checkpoint)?;
        info!("Synthesizer ready at step {}", step);

        Ok(Self {
            config: config.clone(),
            vocabulary: Vocabulary::new(&config.dataset.vocabulary),
            session,
            summary,
            reconstructor,
            step,
        })
    }

    /// Hyperparameters
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session holding the restored parameters
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Encode and pad sentences into one batch
    pub fn encode<S: AsRef<str>>(&self, sentences: &[S]) -> Result<PaddedBatch> {
        let (ids, _) = self.vocabulary.process_sentences(sentences);
        PaddedBatch::new(&ids, self.vocabulary.pad_id())
    }

    /// Predicted spectrograms, one per batch item
    pub fn predict(&mut self, batch: &PaddedBatch) -> Result<Vec<Prediction>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let device = self.session.device();
        let ids = Tensor::from_vec(batch.flat_ids(), (batch.len(), batch.max_len()), device)?;
        let inputs = Inputs::Sentences {
            ids,
            seq_lengths: batch.lengths.clone(),
            targets: None,
        };

        let graph = self.session.model().build(inputs, Mode::Predict)?;
        self.summary.write(self.step, &graph.summary()?)?;

        let reduction = self.session.model().reduction();
        let mut predictions = Vec::with_capacity(batch.len());
        for i in 0..batch.len() {
            let linear = Spectrogram::from_tensor(&graph.linear.get(i)?)?.unfold(reduction)?;
            debug!("Prediction {}: {} frames", i, linear.frames());
            predictions.push(Prediction {
                frames: linear.frames(),
                linear,
            });
        }
        Ok(predictions)
    }

    /// Waveform for a single prediction
    pub fn reconstruct(&self, prediction: &Prediction) -> Result<Vec<f32>> {
        self.reconstructor.reconstruct(&prediction.linear)
    }

    /// Waveforms, one per batch item
    pub fn synthesize(&mut self, batch: &PaddedBatch) -> Result<Vec<Vec<f32>>> {
        let predictions = self.predict(batch)?;
        predictions
            .iter()
            .enumerate()
            .map(|(i, prediction)| {
                info!("Reconstructing {}/{}", i + 1, predictions.len());
                self.reconstruct(prediction)
            })
            .collect()
    }

    /// Synthesize sentences and write one WAV each into `synthesis_dir`
    pub fn synthesize_to_dir<S: AsRef<str>>(&mut self, sentences: &[S]) -> Result<Vec<PathBuf>> {
        let batch = self.encode(sentences)?;
        let waveforms = self.synthesize(&batch)?;

        let inference = &self.config.inference;
        let names = output_file_names(inference.file_naming, sentences);
        let mut written = Vec::with_capacity(waveforms.len());
        for (name, samples) in names.into_iter().zip(&waveforms) {
            let path = inference.synthesis_dir.join(name);
            AudioOutput::save(
                samples,
                self.config.audio.sampling_rate,
                &path,
                inference.normalize_output,
            )?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Non-empty trimmed lines of a sentence file
pub fn read_sentences<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
