//! Griffin-Lim phase reconstruction
//!
//! Recovers a waveform from a magnitude-only spectrogram by alternating
//! between inverse and forward STFT, keeping the target magnitude and the
//! re-estimated phase each round. Always runs exactly the configured number
//! of iterations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use tracing::debug;

use super::spectrogram::Spectrogram;
use super::stft::{ComplexFrames, Stft};
use crate::error::{Result, TacotronError};

/// Estimated bins quieter than this keep a zero phase
const PHASE_EPSILON: f32 = 1e-8;

/// Initial phase estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInit {
    /// All phases zero
    Zero,
    /// Uniform random phases from a seeded generator
    Random(u64),
}

impl Default for PhaseInit {
    fn default() -> Self {
        PhaseInit::Random(0)
    }
}

/// Griffin-Lim reconstructor
pub struct GriffinLim {
    stft: Stft,
    iterations: usize,
    phase_init: PhaseInit,
}

impl GriffinLim {
    /// Create a reconstructor
    ///
    /// # Arguments
    /// * `n_fft` - FFT size
    /// * `win_length` - Window length in samples
    /// * `hop_length` - Hop length in samples
    /// * `iterations` - Number of phase refinement rounds
    pub fn new(
        n_fft: usize,
        win_length: usize,
        hop_length: usize,
        iterations: usize,
    ) -> Result<Self> {
        Ok(Self {
            stft: Stft::new(n_fft, win_length, hop_length)?,
            iterations,
            phase_init: PhaseInit::default(),
        })
    }

    /// Replace the phase initialization
    pub fn with_phase_init(mut self, phase_init: PhaseInit) -> Self {
        self.phase_init = phase_init;
        self
    }

    /// Replace the iteration count
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Iteration count
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Underlying transform
    pub fn stft(&self) -> &Stft {
        &self.stft
    }

    /// Reconstruct a waveform from a (frames, 1 + n_fft/2) magnitude spectrogram
    pub fn reconstruct(&self, magnitude: &Spectrogram) -> Result<Vec<f32>> {
        self.check_magnitude(magnitude)?;

        let mut spectrum = self.initial_spectrum(magnitude);
        let mut signal = self.stft.synthesize(&spectrum)?;

        for i in 0..self.iterations {
            let estimate = self.stft.analyze(&signal);
            apply_phase(&mut spectrum, magnitude, &estimate);
            signal = self.stft.synthesize(&spectrum)?;

            if (i + 1) % 10 == 0 {
                debug!("Griffin-Lim iteration {}/{}", i + 1, self.iterations);
            }
        }

        Ok(signal)
    }

    /// Relative distance between the re-analyzed magnitude of `signal` and
    /// the target: `||S(signal)| - M|_F / |M|_F`.
    pub fn spectral_convergence(&self, signal: &[f32], magnitude: &Spectrogram) -> f32 {
        let analyzed = self.stft.magnitudes(signal);
        let mut diff = 0.0f64;
        let mut norm = 0.0f64;
        for (row, target) in analyzed.iter().zip(magnitude.rows()) {
            for (&a, &m) in row.iter().zip(target.iter()) {
                diff += ((a - m) as f64).powi(2);
                norm += (m as f64).powi(2);
            }
        }
        if norm == 0.0 {
            return diff.sqrt() as f32;
        }
        (diff / norm).sqrt() as f32
    }

    fn check_magnitude(&self, magnitude: &Spectrogram) -> Result<()> {
        let n_freq = self.stft.n_freq();
        if magnitude.bins() != n_freq {
            return Err(TacotronError::shape("GriffinLim::reconstruct", n_freq, magnitude.bins()));
        }
        if let Some(bad) = magnitude.data().iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(TacotronError::shape(
                "GriffinLim::reconstruct",
                "finite non-negative magnitudes",
                bad,
            ));
        }
        Ok(())
    }

    fn initial_spectrum(&self, magnitude: &Spectrogram) -> ComplexFrames {
        match self.phase_init {
            PhaseInit::Zero => magnitude
                .rows()
                .map(|row| row.iter().map(|&m| Complex::new(m, 0.0)).collect())
                .collect(),
            PhaseInit::Random(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                magnitude
                    .rows()
                    .map(|row| {
                        row.iter()
                            .map(|&m| Complex::from_polar(m, rng.gen_range(-PI..PI)))
                            .collect()
                    })
                    .collect()
            }
        }
    }
}

/// Combine the target magnitude with the phase of the estimate
fn apply_phase(spectrum: &mut ComplexFrames, magnitude: &Spectrogram, estimate: &ComplexFrames) {
    for ((frame, target), est) in spectrum.iter_mut().zip(magnitude.rows()).zip(estimate.iter()) {
        for ((bin, &m), e) in frame.iter_mut().zip(target.iter()).zip(est.iter()) {
            let norm = e.norm();
            *bin = if norm > PHASE_EPSILON {
                *e * (m / norm)
            } else {
                Complex::new(m, 0.0)
            };
        }
    }
}
