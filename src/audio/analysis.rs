//! Ground-truth spectrogram analysis
//!
//! Turns a waveform into the normalized linear and mel spectrograms the
//! model is trained against:
//! - magnitude STFT
//! - triangular mel filterbank over the magnitudes
//! - decibel conversion and [0, 1] normalization

use super::conversion::magnitude_to_decibel;
use super::spectrogram::Spectrogram;
use super::stft::Stft;
use crate::config::{Config, DecibelNormalization};
use crate::error::Result;

/// Normalized spectrogram pair of one utterance
#[derive(Debug, Clone)]
pub struct AnalyzedAudio {
    /// (frames, n_mels)
    pub mel: Spectrogram,
    /// (frames, 1 + n_fft/2)
    pub linear: Spectrogram,
}

/// Linear and mel spectrogram computer
pub struct SpectrogramAnalyzer {
    stft: Stft,
    /// Mel filterbank, (n_mels, n_freq)
    mel_filters: Vec<Vec<f32>>,
    mel_norm: DecibelNormalization,
    linear_norm: DecibelNormalization,
}

impl SpectrogramAnalyzer {
    /// Create an analyzer from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let stft = Stft::new(config.audio.n_fft, config.win_length(), config.hop_length())?;
        let (fmin, fmax) = config.mel_range();
        let mel_filters = mel_filterbank(
            config.audio.n_fft,
            config.audio.n_mels,
            config.audio.sampling_rate,
            fmin,
            fmax,
        );

        Ok(Self {
            stft,
            mel_filters,
            mel_norm: config.dataset.mel,
            linear_norm: config.dataset.linear,
        })
    }

    /// Analyze a waveform
    pub fn analyze(&self, audio: &[f32]) -> Result<AnalyzedAudio> {
        let magnitudes = self.stft.magnitudes(audio);

        let linear_rows: Vec<Vec<f32>> = magnitudes
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|&m| self.linear_norm.normalize(magnitude_to_decibel(m)))
                    .collect()
            })
            .collect();

        let mel_rows: Vec<Vec<f32>> = magnitudes
            .iter()
            .map(|frame| {
                self.mel_filters
                    .iter()
                    .map(|filter| {
                        let energy: f32 = filter.iter().zip(frame.iter()).map(|(f, m)| f * m).sum();
                        self.mel_norm.normalize(magnitude_to_decibel(energy))
                    })
                    .collect()
            })
            .collect();

        Ok(AnalyzedAudio {
            mel: Spectrogram::from_rows(&mel_rows)?,
            linear: Spectrogram::from_rows(&linear_rows)?,
        })
    }

    /// Number of mel bands
    pub fn n_mels(&self) -> usize {
        self.mel_filters.len()
    }
}

/// Hz to Mel conversion
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Mel to Hz conversion
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, one row per band.
///
/// Band edges are evenly spaced on the mel scale over `fmin..fmax`. Each
/// triangle is scaled by `2 / (right - left)` (Slaney area normalization)
/// so wide high bands do not dominate the narrow low ones.
fn mel_filterbank(n_fft: usize, n_mels: usize, sr: u32, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
    let bin_hz = sr as f32 / n_fft as f32;
    let (mel_lo, mel_hi) = (hz_to_mel(fmin), hz_to_mel(fmax));
    let step = (mel_hi - mel_lo) / (n_mels + 1) as f32;
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_lo + step * i as f32))
        .collect();

    edges
        .windows(3)
        .map(|band| {
            let (left, center, right) = (band[0], band[1], band[2]);
            let scale = 2.0 / (right - left);
            (0..n_fft / 2 + 1)
                .map(|bin| {
                    let hz = bin as f32 * bin_hz;
                    let rising = (hz - left) / (center - left);
                    let falling = (right - hz) / (right - center);
                    scale * rising.min(falling).max(0.0)
                })
                .collect()
        })
        .collect()
}
