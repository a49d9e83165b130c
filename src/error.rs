//! Error types for the Tacotron crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Tacotron operations.
pub type Result<T> = std::result::Result<T, TacotronError>;

/// Error type for Tacotron operations.
#[derive(Error, Debug)]
pub enum TacotronError {
    /// Invalid or inconsistent hyperparameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The synthesis target folder does not exist.
    #[error("Synthesis target folder does not exist: {0:?}")]
    MissingOutputDir(PathBuf),

    /// No checkpoint was given and none could be found in the run directory.
    #[error("No checkpoint found in {0:?}")]
    NoCheckpoint(PathBuf),

    /// A training or evaluation graph was requested without targets.
    #[error("Mode {0} requires target spectrograms")]
    MissingTarget(&'static str),

    /// Tensor or sequence shape does not match the declared hyperparameters.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    Shape {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected shape or value.
        expected: String,
        /// Actual shape or value.
        actual: String,
    },

    /// Tensor runtime error.
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Summary event serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV writing error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl TacotronError {
    /// Build a shape mismatch error from anything printable.
    pub fn shape(
        context: &'static str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::Shape {
            context,
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}
