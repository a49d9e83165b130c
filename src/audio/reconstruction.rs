//! Normalized spectrogram to waveform

use tracing::debug;

use super::griffin_lim::{GriffinLim, PhaseInit};
use super::spectrogram::Spectrogram;
use crate::config::{Config, DecibelNormalization};
use crate::error::Result;

/// Denormalize, convert to magnitude, then run Griffin-Lim
pub struct Reconstructor {
    griffin_lim: GriffinLim,
    normalization: DecibelNormalization,
    power: f32,
}

impl Reconstructor {
    /// Build from the run configuration, using the linear normalization constants
    pub fn new(config: &Config) -> Result<Self> {
        let griffin_lim = GriffinLim::new(
            config.audio.n_fft,
            config.win_length(),
            config.hop_length(),
            config.audio.reconstruction_iterations,
        )?;

        Ok(Self {
            griffin_lim,
            normalization: config.dataset.linear,
            power: config.audio.power,
        })
    }

    /// Replace the phase initialization
    pub fn with_phase_init(mut self, phase_init: PhaseInit) -> Self {
        self.griffin_lim = self.griffin_lim.with_phase_init(phase_init);
        self
    }

    /// Linear magnitudes of a normalized (frames, 1 + n_fft/2) spectrogram
    pub fn magnitudes(&self, normalized: &Spectrogram) -> Spectrogram {
        let norm = self.normalization;
        let power = self.power;
        normalized.map(|v| {
            let mag = norm.to_magnitude(v);
            if power == 1.0 {
                mag
            } else {
                mag.powf(power)
            }
        })
    }

    /// Reconstruct one waveform
    pub fn reconstruct(&self, normalized: &Spectrogram) -> Result<Vec<f32>> {
        debug!(
            "Reconstructing {} frames with {} Griffin-Lim iterations",
            normalized.frames(),
            self.griffin_lim.iterations()
        );
        let magnitude = self.magnitudes(normalized);
        self.griffin_lim.reconstruct(&magnitude)
    }

    /// Samples produced per frame
    pub fn hop_length(&self) -> usize {
        self.griffin_lim.stft().hop_length()
    }
}
