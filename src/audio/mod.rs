//! Audio processing modules
//!
//! - Decibel/magnitude and time/sample conversions
//! - STFT analysis and overlap-add synthesis
//! - Griffin-Lim phase reconstruction
//! - Ground-truth spectrogram analysis (training targets)
//! - WAV file output

pub mod conversion;
mod analysis;
mod griffin_lim;
mod output;
mod reconstruction;
mod spectrogram;
mod stft;

pub use analysis::{AnalyzedAudio, SpectrogramAnalyzer};
pub use griffin_lim::{GriffinLim, PhaseInit};
pub use output::AudioOutput;
pub use reconstruction::Reconstructor;
pub use spectrogram::Spectrogram;
pub use stft::{hann_window, ComplexFrames, Stft};
